//! Integration tests for folio-drive
//!
//! Uses wiremock to simulate the Drive v3 API and the OAuth token endpoint,
//! and verifies listing, transfers and session opening end to end.


mod test_connector;
mod test_listing;
mod test_transfers;
