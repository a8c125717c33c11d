//! Weighted peer selection scenario (§8): over many rolls, P(peer selected) should track its
//! share of total weight, treating a weight of 0 as 1.

use nhz::events::EventBus;
use nhz::peer::registry::PeerRegistry;
use nhz::peer::PeerState;

#[tokio::test]
async fn selection_frequency_tracks_relative_weight() {
    let registry = PeerRegistry::new(EventBus::new());

    let heavy = "203.0.113.1:7774".to_string();
    let light = "203.0.113.2:7774".to_string();

    registry.add_peer(heavy.clone());
    registry.add_peer(light.clone());
    registry.with_peer_mut(&heavy, |p| {
        p.state = PeerState::Connected;
        p.weight = 9;
    });
    registry.with_peer_mut(&light, |p| {
        p.state = PeerState::Connected;
        p.weight = 1;
    });

    let trials = 4_000;
    let mut heavy_hits = 0usize;
    for _ in 0..trials {
        if let Some(peer) = registry.get_any_peer(PeerState::Connected, false, 0, false, 0) {
            if peer.peer_address == heavy {
                heavy_hits += 1;
            }
        }
    }

    let observed_share = heavy_hits as f64 / trials as f64;
    // Expected share is 9/10; allow generous slack since this is a statistical check, not an
    // exact one.
    assert!(
        (0.75..0.97).contains(&observed_share),
        "expected heavy peer to dominate selection, observed share {observed_share}"
    );
}

#[tokio::test]
async fn zero_weight_peers_are_still_selectable() {
    let registry = PeerRegistry::new(EventBus::new());
    let address = "203.0.113.3:7774".to_string();
    registry.add_peer(address.clone());
    registry.with_peer_mut(&address, |p| p.state = PeerState::Connected);

    let selected = registry.get_any_peer(PeerState::Connected, false, 0, false, 0);
    assert_eq!(selected.unwrap().peer_address, address);
}
