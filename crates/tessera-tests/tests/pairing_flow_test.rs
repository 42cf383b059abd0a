//! Initiator and joiner devices completing one vault together
//!
//! The joiner learns the session only from the initiator's pairing URI, the
//! way a second phone would after scanning the QR code.

mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

use common::{context, test_config, Spy};
use tessera_ceremony::{CeremonyRole, KeyCeremonyOrchestrator, VaultRequest};
use tessera_core::{
    CancelSignal, CeremonyError, CeremonyPhase, Chain, ChainKeyRequest, NoopProgress, PartyId,
    ProgressEvent, ThresholdPolicy,
};
use tessera_qr::{PairingCodec, QrPairingPayload};
use tessera_relay::MemoryRelay;

/// Wait for the SessionSetup event carrying the pairing URI
async fn scan(events: &mut mpsc::UnboundedReceiver<ProgressEvent>) -> QrPairingPayload {
    while let Some(event) = events.recv().await {
        if event.phase == CeremonyPhase::SessionSetup && event.message.starts_with("tessera://") {
            return PairingCodec::default().decode(&event.message).unwrap();
        }
    }
    panic!("initiator never published a pairing URI");
}

#[tokio::test(start_paused = true)]
async fn test_initiator_and_joiner_share_one_vault() {
    let relay = MemoryRelay::new();
    relay
        .add_simulated_peer(PartyId::from("server"), true)
        .await;

    let phone_spy = Arc::new(Spy::new().with_latency(1, 1_500));
    let laptop_spy = Arc::new(Spy::new().with_latency(2, 1_500));
    let phone_ctx = context(&relay, &phone_spy, test_config());
    let laptop_ctx = context(&relay, &laptop_spy, test_config());

    let chains = vec![Chain::Ethereum, Chain::Solana];
    let policy = ThresholdPolicy::new(2, 3);
    let phone_request = VaultRequest::keygen("Family", "phone".into(), policy)
        .with_chains(chains.iter().copied().map(ChainKeyRequest::keygen).collect());

    let (tx, mut rx) = mpsc::unbounded_channel();
    let phone_cancel = CancelSignal::new();
    let laptop_cancel = CancelSignal::new();

    let phone_orchestrator = KeyCeremonyOrchestrator::new(&phone_ctx);
    let laptop_orchestrator = KeyCeremonyOrchestrator::new(&laptop_ctx);

    let initiator = phone_orchestrator.run(&phone_request, &phone_cancel, &tx);
    let joiner = async {
        let payload = scan(&mut rx).await;
        assert_eq!(payload.vault_name, "Family");
        let request = VaultRequest::keygen(payload.vault_name.clone(), "laptop".into(), policy)
            .with_chains(
                payload
                    .chains
                    .iter()
                    .copied()
                    .map(ChainKeyRequest::keygen)
                    .collect(),
            )
            .with_role(CeremonyRole::Joiner(payload));
        laptop_orchestrator
            .run(&request, &laptop_cancel, &NoopProgress)
            .await
    };

    let (phone_vault, laptop_vault) = tokio::join!(initiator, joiner);
    let phone_vault = phone_vault.unwrap();
    let laptop_vault = laptop_vault.unwrap();

    // Initiator lists itself first, joiners sort
    assert_eq!(phone_vault.signers[0], PartyId::from("phone"));
    assert_eq!(
        laptop_vault.signers,
        vec![
            PartyId::from("laptop"),
            PartyId::from("phone"),
            PartyId::from("server")
        ]
    );

    assert_eq!(phone_vault.public_key_ecdsa, laptop_vault.public_key_ecdsa);
    assert_eq!(phone_vault.public_key_eddsa, laptop_vault.public_key_eddsa);
    assert_eq!(phone_vault.chains(), laptop_vault.chains());
    assert_eq!(laptop_vault.local_party_id, PartyId::from("laptop"));

    // The joiner adopted the initiator's session secrets
    let phone_calls = phone_spy.calls();
    let laptop_calls = laptop_spy.calls();
    assert_eq!(phone_calls.len(), 4);
    assert_eq!(laptop_calls.len(), 4);
    assert_eq!(phone_calls[0].chain_code, laptop_calls[0].chain_code);
}

#[tokio::test(start_paused = true)]
async fn test_joiner_sees_initiator_confirmation_with_default_config() {
    for seed in 0..4 {
        let relay = MemoryRelay::new();
        relay
            .add_simulated_peer(PartyId::from("server"), true)
            .await;

        let phone_spy = Arc::new(Spy::new().with_latency(seed, 1_500));
        let laptop_spy = Arc::new(Spy::new().with_latency(seed + 100, 1_500));
        let phone_ctx = context(&relay, &phone_spy, test_config());
        let laptop_ctx = context(&relay, &laptop_spy, test_config());

        let policy = ThresholdPolicy::new(2, 3);
        let phone_request = VaultRequest::keygen("Family", "phone".into(), policy);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let phone_cancel = CancelSignal::new();
        let laptop_cancel = CancelSignal::new();
        let start = Instant::now();

        let initiator = async {
            let vault = KeyCeremonyOrchestrator::new(&phone_ctx)
                .run(&phone_request, &phone_cancel, &tx)
                .await;
            (vault, start.elapsed())
        };
        let joiner = async {
            let payload = scan(&mut rx).await;
            let request = VaultRequest::keygen(payload.vault_name.clone(), "laptop".into(), policy)
                .with_role(CeremonyRole::Joiner(payload));
            let vault = KeyCeremonyOrchestrator::new(&laptop_ctx)
                .run(&request, &laptop_cancel, &NoopProgress)
                .await;
            (vault, start.elapsed())
        };

        let ((phone_vault, phone_done), (laptop_vault, laptop_done)) =
            tokio::join!(initiator, joiner);
        assert!(phone_vault.is_ok());
        assert!(laptop_vault.is_ok());

        // One completion poll after the initiator, never the full timeout
        assert!(
            laptop_done <= phone_done + Duration::from_secs(5),
            "seed {}: joiner finished at {:?}, initiator at {:?}",
            seed,
            laptop_done,
            phone_done
        );
        assert_eq!(relay.session_ids().await.len(), 1);
    }
}

#[tokio::test(start_paused = true)]
async fn test_joiner_with_mismatched_kind_fails_before_joining() {
    let relay = MemoryRelay::new();
    let spy = Arc::new(Spy::new());
    let ctx = context(&relay, &spy, test_config());

    let payload = QrPairingPayload {
        session_id: "8b1f6a8e".into(),
        encryption_key: "ab".repeat(32),
        chain_code: "cd".repeat(32),
        initiator_party_id: PartyId::from("phone"),
        vault_name: "Imported".to_string(),
        chains: vec![],
        kind: tessera_core::CeremonyKind::KeyImport,
        use_relay: true,
    };
    let request = VaultRequest::keygen("Imported", "laptop".into(), ThresholdPolicy::two_of_two())
        .with_role(CeremonyRole::Joiner(payload));

    let err = KeyCeremonyOrchestrator::new(&ctx)
        .run(&request, &CancelSignal::new(), &NoopProgress)
        .await
        .unwrap_err();

    assert!(matches!(err, CeremonyError::InvalidConfig(_)));
    assert_eq!(relay.request_count(), 0);
}

#[test]
fn test_scanned_garbage_is_invalid_payload() {
    let err: CeremonyError = PairingCodec::default()
        .decode("tessera://?type=NewVault&tssType=Keygen")
        .unwrap_err()
        .into();
    assert!(matches!(err, CeremonyError::InvalidPayload(_)));
}
