//! Building catalog: the single source of per-tile metadata.
//!
//! RULE: A tile's category, name, price and service range are looked up
//! here by tile id. Nothing else stores them.
//!
//! The catalog is immutable once built. `standard()` is the built-in table;
//! `load()` reads the same shape from `<data_dir>/catalog/buildings.json`.

use crate::types::{Tile, TileId, SHEET_COLS};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Empty,
    Road,
    House,
    Townhouse,
    Market,
    Kiosk,
    Office,
}

impl Category {
    /// Categories that provide coverage to surrounding cells.
    pub const SERVICES: [Category; 3] = [Category::Kiosk, Category::Market, Category::Office];

    pub fn is_service(self) -> bool {
        matches!(self, Self::Kiosk | Self::Market | Self::Office)
    }

    /// Categories that pay tax and house population.
    pub fn is_residential(self) -> bool {
        matches!(self, Self::House | Self::Townhouse)
    }

    /// Needs an adjacent road to be placed.
    pub fn is_building(self) -> bool {
        self.is_residential() || self.is_service()
    }

    /// Range used for a service subtype the catalog does not list one for.
    /// This is the smallest range of the category.
    pub fn default_range(self) -> Option<u32> {
        match self {
            Self::Kiosk  => Some(4),
            Self::Market => Some(6),
            Self::Office => Some(3),
            _            => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Empty     => "empty",
            Self::Road      => "road",
            Self::House     => "house",
            Self::Townhouse => "townhouse",
            Self::Market    => "market",
            Self::Kiosk     => "kiosk",
            Self::Office    => "office",
        }
    }

    /// One-character map glyph.
    pub fn glyph(self) -> char {
        match self {
            Self::Empty     => '.',
            Self::Road      => '#',
            Self::House     => 'h',
            Self::Townhouse => 't',
            Self::Market    => 'M',
            Self::Kiosk     => 'k',
            Self::Office    => 'O',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub tile:     Tile,
    pub category: Category,
    pub name:     String,
    pub price:    i64,
    /// Service range in cells (Chebyshev). Only meaningful for services.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range:    Option<u32>,
}

impl CatalogEntry {
    pub fn id(&self) -> TileId {
        self.tile.id()
    }
}

#[derive(Debug, Clone, Deserialize)]
struct CatalogFile {
    sheet_cols: TileId,
    buildings:  Vec<CatalogEntry>,
}

#[derive(Debug, Clone)]
pub struct BuildingCatalog {
    entries: HashMap<TileId, CatalogEntry>,
}

impl BuildingCatalog {
    /// Load from `<data_dir>/catalog/buildings.json`.
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/catalog/buildings.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let file: CatalogFile = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        anyhow::ensure!(
            file.sheet_cols == SHEET_COLS,
            "{path}: sheet_cols is {}, engine expects {SHEET_COLS}",
            file.sheet_cols
        );
        Self::from_entries(file.buildings)
    }

    pub fn from_entries(entries: Vec<CatalogEntry>) -> anyhow::Result<Self> {
        let mut by_id = HashMap::with_capacity(entries.len());
        for entry in entries {
            anyhow::ensure!(
                !entry.tile.is_empty() && entry.category != Category::Empty,
                "'{}' uses the empty sentinel",
                entry.name
            );
            anyhow::ensure!(
                (entry.tile.col() as TileId) < SHEET_COLS,
                "'{}' has sprite column {} outside the sheet",
                entry.name,
                entry.tile.col()
            );
            anyhow::ensure!(entry.price >= 0, "'{}' has a negative price", entry.name);
            anyhow::ensure!(
                entry.range.is_none() || entry.category.is_service(),
                "'{}' is a {} and cannot have a range",
                entry.name,
                entry.category.label()
            );
            let id = entry.id();
            if let Some(previous) = by_id.insert(id, entry) {
                anyhow::bail!("tile id {id} listed twice ('{}')", previous.name);
            }
        }
        Ok(Self { entries: by_id })
    }

    /// The built-in catalog matching `data/catalog/buildings.json`.
    pub fn standard() -> Self {
        let mut entries = Vec::new();
        let mut add = |row: u8, col: u8, category: Category, name: &str, price: i64, range: Option<u32>| {
            entries.push(CatalogEntry {
                tile: Tile::new(row, col),
                category,
                name: name.to_string(),
                price,
                range,
            });
        };

        // Row 0: road pieces. Column 0 is the empty sentinel.
        let roads = [
            "Road (north-south)", "Road (east-west)",
            "Road corner (north-east)", "Road corner (east-south)",
            "Road corner (south-west)", "Road corner (west-north)",
            "Road junction (no north)", "Road junction (no east)",
            "Road junction (no south)", "Road junction (no west)",
            "Road crossing",
        ];
        for (k, name) in roads.iter().enumerate() {
            add(0, k as u8 + 1, Category::Road, name, 100, None);
        }

        add(1, 0, Category::House, "Cottage",     100,  None);
        add(1, 1, Category::House, "Bungalow",    250,  None);
        add(1, 2, Category::House, "Family house", 500, None);
        add(1, 3, Category::House, "Villa",       1000, None);

        add(2, 0, Category::Townhouse, "Row house", 800,  None);
        add(2, 1, Category::Townhouse, "Duplex",    1200, None);
        add(2, 2, Category::Townhouse, "Terrace",   1600, None);

        add(3, 0, Category::Market, "Small market",  2000, Some(6));
        add(3, 1, Category::Market, "Medium market", 3500, Some(7));
        add(3, 2, Category::Market, "Large market",  5000, Some(8));

        add(4, 0, Category::Kiosk, "Cheap kiosk",     500, Some(4));
        add(4, 1, Category::Kiosk, "Expensive kiosk", 900, Some(5));

        add(5, 0, Category::Office, "Small office",   3000,  Some(3));
        add(5, 1, Category::Office, "Medium office",  5000,  Some(4));
        add(5, 2, Category::Office, "Office tower",   8000,  Some(5));
        add(5, 3, Category::Office, "Office complex", 12000, Some(6));

        // The table above is static and satisfies every from_entries check.
        let by_id = entries.into_iter().map(|e| (e.id(), e)).collect();
        Self { entries: by_id }
    }

    pub fn get(&self, tile: Tile) -> Option<&CatalogEntry> {
        self.entries.get(&tile.id())
    }

    /// Semantic category of a tile. Unknown ids and the sentinel map to `Empty`.
    pub fn category(&self, tile: Tile) -> Category {
        self.get(tile).map(|e| e.category).unwrap_or(Category::Empty)
    }

    pub fn price(&self, tile: Tile) -> Option<i64> {
        self.get(tile).map(|e| e.price)
    }

    /// Effective service range of a specific subtype.
    pub fn range(&self, tile: Tile) -> Option<u32> {
        let entry = self.get(tile)?;
        entry.range.or_else(|| entry.category.default_range())
    }

    pub fn is_road(&self, tile: Tile) -> bool {
        self.category(tile) == Category::Road
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries ordered by tile id.
    pub fn entries(&self) -> Vec<&CatalogEntry> {
        let sorted: BTreeMap<TileId, &CatalogEntry> =
            self.entries.iter().map(|(id, e)| (*id, e)).collect();
        sorted.into_values().collect()
    }

    pub fn by_category(&self, category: Category) -> Vec<&CatalogEntry> {
        self.entries()
            .into_iter()
            .filter(|e| e.category == category)
            .collect()
    }
}
