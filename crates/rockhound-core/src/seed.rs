//! Content a fresh game starts with: the counterpart's trade inventory and
//! the demo land listings.

use chrono::Utc;
use rockhound_types::{GameState, JournalEntry, JournalEntryId, LandListing, ListingId, Rarity};

struct SeedSpecimen {
    name: &'static str,
    rarity: Rarity,
    formula: &'static str,
    hardness: &'static str,
    description: &'static str,
}

const COUNTERPART_SPECIMENS: &[SeedSpecimen] = &[
    SeedSpecimen {
        name: "Clear Quartz",
        rarity: Rarity::Common,
        formula: "SiO\u{2082}",
        hardness: "7",
        description: "The most versatile and common crystal in the mineral kingdom, prized \
                      for its clarity and piezoelectric properties.",
    },
    SeedSpecimen {
        name: "Amethyst",
        rarity: Rarity::Uncommon,
        formula: "SiO\u{2082}",
        hardness: "7",
        description: "A purple variety of quartz coloured by irradiation and iron \
                      impurities. Largest deposits are in Brazil and Uruguay.",
    },
    SeedSpecimen {
        name: "Geode",
        rarity: Rarity::Uncommon,
        formula: "N/A (Formation)",
        hardness: "Varies (often 7)",
        description: "A hollow, roughly spherical rock lined with crystals deposited \
                      from hydrothermal fluids.",
    },
    SeedSpecimen {
        name: "Celestine",
        rarity: Rarity::Rare,
        formula: "SrSO\u{2084}",
        hardness: "3-3.5",
        description: "Strontium sulfate named for its delicate blue colour, found in \
                      cavities of sandstone and limestone.",
    },
    SeedSpecimen {
        name: "Beryl",
        rarity: Rarity::Epic,
        formula: "Be\u{2083}Al\u{2082}(SiO\u{2083})\u{2086}",
        hardness: "7.5-8",
        description: "Beryllium aluminium cyclosilicate whose varieties include emerald, \
                      aquamarine and morganite.",
    },
];

/// The counterpart's starting inventory.
pub fn counterpart_inventory() -> Vec<JournalEntry> {
    let now = Utc::now();
    COUNTERPART_SPECIMENS
        .iter()
        .map(|seed| JournalEntry {
            id: JournalEntryId::new(),
            name: seed.name.to_owned(),
            description: seed.description.to_owned(),
            score: seed.rarity.base_points(),
            date: now,
            rarity: seed.rarity,
            image_url: None,
            mineral_composition: Some(seed.formula.to_owned()),
            hardness: Some(seed.hardness.to_owned()),
            geological_context: None,
        })
        .collect()
}

/// The demo land listings.
pub fn listings() -> Vec<LandListing> {
    vec![
        LandListing {
            id: ListingId::new(),
            property_name: "The Crystal Gorge".to_owned(),
            land_owner_name: "Jane Doe".to_owned(),
            location: "A private creek bed 10 miles from Ouray, Colorado".to_owned(),
            fee: 50,
            minerals_known: vec!["Smoky Quartz".to_owned(), "Amethyst Geodes".to_owned()],
            access_rules: "No heavy machinery. Digging tools are welcome. Respect the land."
                .to_owned(),
            additional_notes:
                "The creek is seasonal, so visit during the spring for the best finds.".to_owned(),
            image_url: Some(
                "https://images.unsplash.com/photo-1589394183539-7223499429d2?q=80&w=800&auto=format&fit=crop"
                    .to_owned(),
            ),
        },
        LandListing {
            id: ListingId::new(),
            property_name: "Geode Hill Quarry".to_owned(),
            land_owner_name: "John Smith".to_owned(),
            location: "Near Warsaw, Illinois".to_owned(),
            fee: 25,
            minerals_known: vec![
                "Geodes".to_owned(),
                "Calcite".to_owned(),
                "Chalcedony".to_owned(),
            ],
            access_rules: "Daylight hours only. Hard hats recommended. Keep what you find."
                .to_owned(),
            additional_notes: "This is a working quarry, but a specific section is open to the \
                               public on weekends."
                .to_owned(),
            image_url: Some(
                "https://images.unsplash.com/photo-1525199340114-153644b41324?q=80&w=800&auto=format&fit=crop"
                    .to_owned(),
            ),
        },
        LandListing {
            id: ListingId::new(),
            property_name: "Old Miller's Farm".to_owned(),
            land_owner_name: "Sam Miller".to_owned(),
            location: "Rural area outside Nashville, Tennessee".to_owned(),
            fee: 10,
            minerals_known: vec!["Agate".to_owned(), "Jasper".to_owned(), "Fossils".to_owned()],
            access_rules: "Please check in at the farmhouse before entering the fields. No \
                           digging near livestock."
                .to_owned(),
            additional_notes: "Mainly surface collecting in plowed fields. Best after a fresh rain."
                .to_owned(),
            image_url: Some(
                "https://images.unsplash.com/photo-1444930694458-04f47828c848?q=80&w=800&auto=format&fit=crop"
                    .to_owned(),
            ),
        },
    ]
}

/// Fill an empty state's inventory and listings.
///
/// Only empty collections are filled, so a restored game is never reseeded.
pub fn seed_state(state: &mut GameState) {
    if state.trade_inventory.is_empty() {
        state.trade_inventory = counterpart_inventory()
            .into_iter()
            .map(|entry| (entry.id, entry))
            .collect();
    }
    if state.listings.is_empty() {
        state.listings = listings();
    }
}
