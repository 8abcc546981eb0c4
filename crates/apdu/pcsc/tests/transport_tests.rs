//! Tests for the PC/SC transport against real hardware
//!
//! Every test skips when PC/SC, a reader or a card is unavailable.

use std::time::Duration;

use beid_apdu_core::prelude::*;
use beid_apdu_transport_pcsc::{PcscConfig, PcscDeviceManager, PcscTransport, ShareMode};

fn test_transport() -> Option<PcscTransport> {
    let manager = PcscDeviceManager::new().ok()?;
    let readers = manager.list_readers().ok()?;
    let reader = readers.iter().find(|r| r.has_card())?;
    manager.connect(reader.name()).ok()
}

#[test]
fn test_reader_listing() {
    let Ok(manager) = PcscDeviceManager::new() else {
        println!("Skipping test, PC/SC not available");
        return;
    };

    let names = manager.reader_names().unwrap();
    match manager.list_readers() {
        Ok(readers) => {
            let listed: Vec<_> = readers.iter().map(|r| r.name().to_string()).collect();
            assert_eq!(listed, names);
            for reader in readers.iter().filter(|r| r.has_card()) {
                assert!(reader.atr().is_some_and(|atr| !atr.is_empty()));
            }
        }
        Err(e) => {
            assert!(names.is_empty());
            println!("No readers: {e}");
        }
    }
}

#[test]
fn test_presence_wait_returns_current_state() {
    let Ok(manager) = PcscDeviceManager::new() else {
        println!("Skipping test, PC/SC not available");
        return;
    };
    let Ok(readers) = manager.list_readers() else {
        println!("Skipping test, no readers");
        return;
    };

    for reader in readers {
        let present = manager
            .wait_for_card_present(reader.name(), Duration::from_millis(50))
            .unwrap();
        assert_eq!(present, reader.has_card());
    }
}

#[test]
fn test_transport_transmit_in_transaction() {
    let Some(transport) = test_transport() else {
        println!("Skipping test, no card available");
        return;
    };

    let mut executor = CardExecutor::new(transport);
    {
        let mut tx = executor.transaction().unwrap();
        assert!(tx.transport().transaction_active());

        // SELECT MF; any status word is acceptable, we only check the exchange
        let response = tx
            .execute(&Command::new_with_data(0x00, 0xA4, 0x02, 0x0C, vec![0x3F, 0x00]))
            .unwrap();
        println!("Response: {}", response.status());
    }
    assert!(!executor.transport().transaction_active());
    assert!(!executor.transport().atr().unwrap().is_empty());
}

#[test]
fn test_connect_unknown_reader() {
    let Ok(manager) = PcscDeviceManager::with_config(PcscConfig::new().with_share_mode(ShareMode::Shared)) else {
        println!("Skipping test, PC/SC not available");
        return;
    };

    let err = manager.connect("No Such Reader 00 00").unwrap_err();
    assert!(matches!(
        err,
        TransportError::ReaderNotFound(_) | TransportError::Other(_) | TransportError::NoCard(_)
    ));
}
