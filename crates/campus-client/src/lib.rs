//! Client side of the portal's listings: filter state, paginated fetching
//! with stale-response protection, favorite and membership toggles, detail
//! loading and the gateway adapters they run against.

pub mod config;
pub mod detail;
pub mod error;
pub mod fetcher;
pub mod filter_state;
pub mod filters;
pub mod format;
pub mod gateway;
pub mod notice;
pub mod session;
pub mod toggle;

#[cfg(test)]
mod testing;

pub use config::ClientConfig;
pub use detail::{DetailLoader, DetailState};
pub use error::GatewayError;
pub use fetcher::{FetchOutcome, ListController, ListFetcher, ListState, PageView, build_query};
pub use filter_state::FilterState;
pub use filters::{
    CareerFilters, ClubFilters, EventFilters, FormationFilters, ListFilters, OfferFilters,
    SectorFilters,
};
pub use gateway::{Gateway, HttpGateway, LocalGateway, TimeoutGateway};
pub use notice::{Notice, NoticeLevel, Notices};
pub use session::{Identity, Session};
pub use toggle::{FavoriteTarget, MembershipTarget, Toggle, ToggleOutcome};
