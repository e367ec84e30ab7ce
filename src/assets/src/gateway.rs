//! Gateway selection for assets behind a network domain

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use crate::types::{Asset, Domain, GatewayWithAuth};

/// Message returned when an asset has no usable gateway
pub const NO_GATEWAY_MSG: &str = "Not have gateway";

/// Picks a gateway for `asset` uniformly at random
///
/// Only gateways of `domain` speaking the asset's protocol are candidates.
/// Returns `None` when the asset has no domain, `domain` is not the asset's
/// domain, or no gateway matches the protocol. Pass a seeded
/// [`rand::rngs::StdRng`] for reproducible picks.
pub fn select_gateway<R>(asset: &Asset, domain: Option<&Domain>, rng: &mut R) -> Option<GatewayWithAuth>
where
    R: Rng + ?Sized,
{
    let domain_id = asset.domain?;
    let domain = domain.filter(|d| d.id == domain_id)?;

    let candidates = domain.gateways_for(asset.protocol);
    let gateway = candidates.choose(rng)?;

    debug!(
        asset = asset.id,
        domain = domain.id,
        gateway = gateway.id,
        candidates = candidates.len(),
        "Selected gateway"
    );
    Some(GatewayWithAuth::new(gateway, domain.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Gateway, Protocol};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn domain() -> Domain {
        Domain::new(1, "dc-east")
            .with_gateway(Gateway::new(10, "g1", "10.1.0.1", Protocol::Ssh))
            .with_gateway(Gateway::new(11, "g2", "10.1.0.2", Protocol::Rdp))
            .with_gateway(Gateway::new(12, "g3", "10.1.0.3", Protocol::Ssh))
    }

    #[test]
    fn test_only_matching_protocol_is_picked() {
        let domain = domain();
        let asset = Asset::new(1, "win", "10.0.0.1")
            .with_domain(1)
            .with_protocol(Protocol::Rdp);
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..20 {
            let picked = select_gateway(&asset, Some(&domain), &mut rng).unwrap();
            assert_eq!(picked.id, 11);
        }
    }

    #[test]
    fn test_random_pick_covers_candidates() {
        let domain = domain();
        let asset = Asset::new(1, "linux", "10.0.0.1").with_domain(1);
        let mut rng = StdRng::seed_from_u64(42);

        let picked: HashSet<u64> = (0..100)
            .filter_map(|_| select_gateway(&asset, Some(&domain), &mut rng))
            .map(|g| g.id)
            .collect();
        assert_eq!(picked, HashSet::from([10, 12]));
    }

    #[test]
    fn test_seeded_rng_is_reproducible() {
        let domain = domain();
        let asset = Asset::new(1, "linux", "10.0.0.1").with_domain(1);

        let run = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..10)
                .map(|_| select_gateway(&asset, Some(&domain), &mut rng).unwrap().id)
                .collect::<Vec<_>>()
        };
        assert_eq!(run(3), run(3));
    }

    #[test]
    fn test_no_gateway() {
        let domain = domain();
        let mut rng = StdRng::seed_from_u64(1);

        let no_domain = Asset::new(1, "a", "10.0.0.1");
        assert!(select_gateway(&no_domain, Some(&domain), &mut rng).is_none());

        let wrong_domain = Asset::new(2, "b", "10.0.0.2").with_domain(2);
        assert!(select_gateway(&wrong_domain, Some(&domain), &mut rng).is_none());

        let missing_record = Asset::new(3, "c", "10.0.0.3").with_domain(1);
        assert!(select_gateway(&missing_record, None, &mut rng).is_none());

        let telnet = Asset::new(4, "d", "10.0.0.4")
            .with_domain(1)
            .with_protocol(Protocol::Telnet);
        assert!(select_gateway(&telnet, Some(&domain), &mut rng).is_none());
    }
}
