//! Publishable items and the ordered set handed to the orchestrator

use heapless::Vec;

use crate::constants::MAX_PUBLISH_ITEMS;

/// What an item reports on. Declaration order is publish order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ItemKind {
    /// Ambient light
    Light,
    /// Temperature
    Temperature,
    /// Relative humidity
    Humidity,
    /// Motion sensor level
    Motion,
}

impl ItemKind {
    /// All kinds, in publish order
    pub const ALL: [ItemKind; 4] = [
        ItemKind::Light,
        ItemKind::Temperature,
        ItemKind::Humidity,
        ItemKind::Motion,
    ];

    /// Human-readable name
    pub const fn name(&self) -> &'static str {
        match self {
            ItemKind::Light => "light",
            ItemKind::Temperature => "temperature",
            ItemKind::Humidity => "humidity",
            ItemKind::Motion => "motion",
        }
    }
}

/// One message to publish
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Item {
    /// Light reading in lux
    Light(u16),
    /// Temperature in the configured unit
    Temperature(f32),
    /// Relative humidity in %
    Humidity(f32),
    /// Motion level
    Motion(bool),
    /// Discovery document announcing the sensor of this kind
    Discovery(ItemKind),
}

impl Item {
    /// Kind this item reports on
    pub const fn kind(&self) -> ItemKind {
        match self {
            Item::Light(_) => ItemKind::Light,
            Item::Temperature(_) => ItemKind::Temperature,
            Item::Humidity(_) => ItemKind::Humidity,
            Item::Motion(_) => ItemKind::Motion,
            Item::Discovery(kind) => *kind,
        }
    }
}

/// Items for one publish run, kept in publish order
///
/// Holds at most one item per kind; pushing a kind that is already present
/// replaces it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PublishSet {
    items: Vec<Item, MAX_PUBLISH_ITEMS>,
}

impl PublishSet {
    /// Empty set
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Discovery announcements for every sensor the node carries
    pub fn discovery() -> Self {
        let mut set = Self::new();
        for kind in ItemKind::ALL {
            set.insert(Item::Discovery(kind));
        }
        set
    }

    /// Add an item at its publish position
    pub fn insert(&mut self, item: Item) {
        let kind = item.kind();
        if let Some(slot) = self.items.iter_mut().find(|i| i.kind() == kind) {
            *slot = item;
            return;
        }

        let at = self
            .items
            .iter()
            .position(|i| i.kind() > kind)
            .unwrap_or(self.items.len());
        // One slot per kind, so capacity is never exceeded
        let _ = self.items.insert(at, item);
    }

    /// Nothing to publish
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Items in publish order
    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.iter()
    }

    /// Whether an item of `kind` is in the set
    pub fn contains(&self, kind: ItemKind) -> bool {
        self.items.iter().any(|i| i.kind() == kind)
    }
}
