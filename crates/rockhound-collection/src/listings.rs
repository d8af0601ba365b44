//! Land access listings published by property owners.

use rockhound_types::{GameState, LandListing, ListingId};
use tracing::info;

/// Owner-supplied fields of a new listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingDraft {
    /// Property name.
    pub property_name: String,
    /// Owner's name.
    pub land_owner_name: String,
    /// Free-text location.
    pub location: String,
    /// Access fee in dollars.
    pub fee: u64,
    /// Minerals known to occur there.
    pub minerals_known: Vec<String>,
    /// Visitor rules.
    pub access_rules: String,
    /// Anything else.
    pub additional_notes: String,
    /// Optional photo reference.
    pub image_url: Option<String>,
}

impl ListingDraft {
    /// Assign an id and produce the listing.
    pub fn into_listing(self) -> LandListing {
        LandListing {
            id: ListingId::new(),
            property_name: self.property_name.trim().to_owned(),
            land_owner_name: self.land_owner_name.trim().to_owned(),
            location: self.location.trim().to_owned(),
            fee: self.fee,
            minerals_known: self
                .minerals_known
                .into_iter()
                .map(|m| m.trim().to_owned())
                .filter(|m| !m.is_empty())
                .collect(),
            access_rules: self.access_rules,
            additional_notes: self.additional_notes,
            image_url: self.image_url,
        }
    }
}

/// Publish a listing; newest first.
pub fn create_listing(state: &mut GameState, draft: ListingDraft) -> LandListing {
    let listing = draft.into_listing();
    state.listings.insert(0, listing.clone());
    info!(listing_id = %listing.id, property = %listing.property_name, "listing created");
    listing
}
