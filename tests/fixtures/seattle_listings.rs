//! Seattle open-house listings for realistic test fixtures.
//!
//! Coordinates are approximate street-level positions of public landmarks.

/// An address with the coordinates the stub geocoder resolves it to.
#[derive(Debug, Clone)]
pub struct Listing {
    pub address: &'static str,
    pub lat: f64,
    pub lng: f64,
}

impl Listing {
    pub const fn new(address: &'static str, lat: f64, lng: f64) -> Self {
        Self { address, lat, lng }
    }
}

// ============================================================================
// Office (start) and end-of-day destination
// ============================================================================

pub const OFFICE: Listing = Listing::new("400 Broad St, Seattle, WA", 47.6205, -122.3493);

pub const HOME: Listing = Listing::new("1001 Fairview Ave N, Seattle, WA", 47.6285, -122.3298);

// ============================================================================
// Listings
// ============================================================================

pub const LISTINGS: &[Listing] = &[
    Listing::new("1912 Pike Pl, Seattle, WA", 47.6101, -122.3421),
    Listing::new("2101 N Northlake Way, Seattle, WA", 47.6456, -122.3344),
    Listing::new("1000 4th Ave, Seattle, WA", 47.6067, -122.3325),
    Listing::new("3801 Discovery Park Blvd, Seattle, WA", 47.6573, -122.4055),
    Listing::new("1400 E Prospect St, Seattle, WA", 47.6302, -122.3149),
];

/// Returns a subset of listings for smaller tests.
pub fn sample_listings(count: usize) -> Vec<Listing> {
    LISTINGS.iter().take(count).cloned().collect()
}

/// Every address the stub geocoder knows.
pub fn all_listings() -> Vec<Listing> {
    let mut all = vec![OFFICE, HOME];
    all.extend_from_slice(LISTINGS);
    all
}
