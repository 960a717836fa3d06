// ── Navigation graph ──
//
// Built in three steps so forward references and cycles need no special
// construction order:
//   1. declare every page id,
//   2. wire and validate edges and buttons against the declared ids,
//   3. materialize the pages, each holding a weak handle to the table.
// Pages navigate by id through the table, so the graph holds no Arc cycles.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};
use std::time::Duration;

use shackdeck_core::DeviceHub;
use tracing::info;

use crate::error::DeckError;
use crate::layout::PageLayout;
use crate::page::PageRef;
use crate::pages::GenericPage;
use crate::press::LONG_PRESS;
use crate::surface::ButtonSurface;
use crate::widget::ButtonSet;

/// The layout pages, keyed by id.
pub struct PageTable {
    pages: HashMap<String, Arc<GenericPage>>,
}

impl PageTable {
    pub fn get(&self, id: &str) -> Option<PageRef> {
        self.pages.get(id).map(|p| {
            let page: PageRef = p.clone();
            page
        })
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Page ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.pages.keys().cloned().collect();
        ids.sort();
        ids
    }
}

/// A wired page waiting to be materialized.
struct PagePlan {
    id: String,
    parent: Option<String>,
    buttons: ButtonSet,
}

/// Builder inputs beyond the layouts themselves.
pub struct GraphOptions {
    pub hub: Arc<DeviceHub>,
    pub surface: Arc<dyn ButtonSurface>,
    pub long_press: Duration,
}

impl GraphOptions {
    pub fn new(hub: Arc<DeviceHub>, surface: Arc<dyn ButtonSurface>) -> Self {
        Self {
            hub,
            surface,
            long_press: LONG_PRESS,
        }
    }

    #[must_use]
    pub fn long_press(mut self, threshold: Duration) -> Self {
        self.long_press = threshold;
        self
    }
}

/// The materialized layout pages plus the entry point.
pub struct PageGraph {
    table: Arc<PageTable>,
    root: PageRef,
}

impl PageGraph {
    /// Build and attach every page. Any layout error aborts the build.
    pub async fn build(
        layouts: &[PageLayout],
        root_id: &str,
        options: GraphOptions,
    ) -> Result<Self, DeckError> {
        // ── 1. declare ──
        let mut declared = HashSet::new();
        for layout in layouts {
            if !declared.insert(layout.id.as_str()) {
                return Err(DeckError::DuplicatePage {
                    page: layout.id.clone(),
                });
            }
        }
        let known = |id: &str| -> Result<(), DeckError> {
            if declared.contains(id) {
                Ok(())
            } else {
                Err(DeckError::UnknownPage { page: id.to_owned() })
            }
        };
        known(root_id)?;

        // ── 2. wire ──
        let button_count = options.surface.button_count();
        let mut plans = Vec::with_capacity(layouts.len());
        for layout in layouts {
            if let Some(parent) = &layout.parent {
                known(parent)?;
            }
            for next in layout.buttons.iter().filter_map(|b| b.next()) {
                known(next)?;
            }
            plans.push(PagePlan {
                id: layout.id.clone(),
                parent: layout.parent.clone(),
                buttons: ButtonSet::from_layout(&layout.id, &layout.buttons, button_count)?,
            });
        }

        // ── 3. materialize ──
        let table = Arc::new_cyclic(|table: &Weak<PageTable>| PageTable {
            pages: plans
                .into_iter()
                .map(|plan| {
                    let page = GenericPage::new(
                        plan.id.clone(),
                        plan.parent,
                        plan.buttons,
                        table.clone(),
                        Arc::clone(&options.hub),
                        Arc::clone(&options.surface),
                        options.long_press,
                    );
                    (plan.id, page)
                })
                .collect(),
        });

        for page in table.pages.values() {
            page.attach().await?;
        }

        let root = table.get(root_id).ok_or_else(|| DeckError::UnknownPage {
            page: root_id.to_owned(),
        })?;
        info!(pages = table.len(), root = %root_id, "page graph built");

        Ok(Self { table, root })
    }

    pub fn root(&self) -> PageRef {
        Arc::clone(&self.root)
    }

    pub fn page(&self, id: &str) -> Option<PageRef> {
        self.table.get(id)
    }

    pub fn table(&self) -> &PageTable {
        &self.table
    }
}
