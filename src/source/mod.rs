// src/source/mod.rs
pub mod ctrip;

use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::config::Route;
use crate::error::FetchError;
use crate::tracker::{ItineraryKind, MonitoredDate};

/// Lowest quoted price per `YYYYMMDD` date for one query.
pub type PriceMap = BTreeMap<String, u32>;

#[async_trait]
pub trait PriceSource: Send + Sync {
    /// One query for `kind`. An empty map means "no data", not a failure.
    async fn fetch(&self, route: &Route, kind: ItineraryKind) -> Result<PriceMap, FetchError>;
    fn name(&self) -> &'static str;
}

/// Both queries of one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Observations {
    pub direct: PriceMap,
    pub connecting: PriceMap,
}

impl Observations {
    pub fn get(&self, kind: ItineraryKind, date: &MonitoredDate) -> Option<u32> {
        let side = match kind {
            ItineraryKind::Direct => &self.direct,
            ItineraryKind::Connecting => &self.connecting,
        };
        side.get(date.as_str()).copied().filter(|p| *p > 0)
    }

    pub fn is_empty(&self) -> bool {
        self.direct.is_empty() && self.connecting.is_empty()
    }
}

/// Run the direct and connecting queries concurrently. Both always run to
/// completion; if either fails the whole fetch fails.
pub async fn fetch_all(source: &dyn PriceSource, route: &Route) -> Result<Observations, FetchError> {
    let (direct, connecting) = tokio::join!(
        source.fetch(route, ItineraryKind::Direct),
        source.fetch(route, ItineraryKind::Connecting),
    );

    match (direct, connecting) {
        (Ok(direct), Ok(connecting)) => Ok(Observations { direct, connecting }),
        (Err(e), Ok(_)) | (Ok(_), Err(e)) => Err(e),
        (Err(e), Err(other)) => {
            tracing::warn!(
                source = source.name(),
                kind = %other.kind(),
                error = %other,
                "second query failed too"
            );
            Err(e)
        }
    }
}
