//! Card operations over an APDU executor

use std::thread;
use std::time::Duration;

use beid_apdu_core::{Executor, ResultExt, StatusWord};
use bytes::{Bytes, BytesMut};
use sha1::{Digest, Sha1};
use tracing::{Level, debug, info, instrument, trace, warn};

use crate::commands::{
    ChangeReferenceData, EidCommand, GetCardData, GetChallenge, InternalAuthenticate,
    ManageSecurityEnvironment, PerformSecurityOperation, ReadBinary, ResetRetryCounter,
    SelectFile, SignatureKind, Verify,
};
use crate::constants::FileId;
use crate::pin::PinBlock;
use crate::{Error, Result};

/// An eID card reachable through an [`Executor`]
///
/// Every operation that needs more than one APDU runs inside a card
/// transaction, released when the operation returns.
#[derive(Debug)]
pub struct EidCard<E: Executor> {
    executor: E,
    read_settle_delay: Duration,
}

impl<E: Executor> EidCard<E> {
    /// Create a card over the given executor
    pub const fn new(executor: E) -> Self {
        Self {
            executor,
            read_settle_delay: Duration::ZERO,
        }
    }

    /// Pause for `delay` after every file read
    pub const fn with_read_settle_delay(mut self, delay: Duration) -> Self {
        self.read_settle_delay = delay;
        self
    }

    /// Get a reference to the executor
    pub const fn executor(&self) -> &E {
        &self.executor
    }

    /// Get a mutable reference to the executor
    pub const fn executor_mut(&mut self) -> &mut E {
        &mut self.executor
    }

    /// Take ownership of the executor
    pub fn into_executor(self) -> E {
        self.executor
    }

    /// Read a whole elementary file of at most `max_len` bytes
    ///
    /// Blocks of 0xF8 bytes are read until the card stops answering 90 00.
    /// A `6C XX` answer is followed by one last read of exactly XX bytes,
    /// which must succeed.
    #[instrument(level = "debug", skip(self, file), fields(file = %file))]
    pub fn read_file(&mut self, file: FileId, max_len: usize) -> Result<Bytes> {
        let data = {
            let mut tx = self.executor.transaction()?;
            send(&mut *tx, &SelectFile::new(file))?;

            let mut data = BytesMut::with_capacity(max_len);
            loop {
                let offset = block_offset(data.len())?;
                // 6B 00 and 6C XX end the file
                let response = tx.execute(&ReadBinary::block(offset)).context(ReadBinary::NAME)?;
                let status = response.status();

                if status.is_success() {
                    if response.data().is_empty() {
                        break;
                    }
                    append_block(&mut data, response.data(), max_len)?;
                } else if let Some(available) = status.available_length() {
                    trace!(offset, available, "Reading final short block");
                    let response = send(&mut *tx, &ReadBinary::new(offset, available))?;
                    if !response.is_success() {
                        return Err(Error::InvalidStatusWord(response.status()));
                    }
                    append_block(&mut data, response.data(), max_len)?;
                    break;
                } else {
                    trace!(offset, %status, "Read ended");
                    break;
                }
            }
            data.freeze()
        };

        debug!(len = data.len(), "Read file");
        if !self.read_settle_delay.is_zero() {
            thread::sleep(self.read_settle_delay);
        }
        Ok(data)
    }

    /// Raw card data block with the chip and applet versions
    pub fn card_data(&mut self) -> Result<Bytes> {
        send(&mut self.executor, &GetCardData::new())
    }

    /// Random bytes generated by the card
    pub fn challenge(&mut self) -> Result<Bytes> {
        send(&mut self.executor, &GetChallenge::new())
    }

    /// Signature of `challenge` with the authentication key
    pub fn challenge_response(&mut self, challenge: &[u8]) -> Result<Bytes> {
        if challenge.len() > u8::MAX as usize - 2 {
            return Err(Error::InvalidData("challenge is too long"));
        }
        send(&mut self.executor, &InternalAuthenticate::new(challenge))
    }

    /// Verify the cardholder PIN, returning the remaining tries
    pub fn verify_pin(&mut self, pin: &str) -> Result<u8> {
        let block = PinBlock::encode(pin)?;
        debug!(digits = block.digit_count(), "Verifying PIN");

        let mut tx = self.executor.transaction()?;
        send(&mut *tx, &Verify::new(&block))
    }

    /// Replace the cardholder PIN, returning the remaining tries
    pub fn change_pin(&mut self, current: &str, new: &str) -> Result<u8> {
        let current = PinBlock::encode(current)?;
        let new = PinBlock::encode(new)?;
        debug!(digits = new.digit_count(), "Changing PIN");

        let mut tx = self.executor.transaction()?;
        send(&mut *tx, &ChangeReferenceData::new(&current, &new))
    }

    /// Unblock the PIN with the citizen and government PUKs
    pub fn reactivate(&mut self, citizen_puk: &str, government_puk: &str) -> Result<()> {
        let puk = PinBlock::encode_puk(citizen_puk, government_puk)?;
        debug!("Reactivating PIN");

        let mut tx = self.executor.transaction()?;
        send(&mut *tx, &ResetRetryCounter::new(&puk))
    }

    /// Sign the SHA-1 digest of `data` with the key for `kind`
    ///
    /// The key is selected and the PIN verified in the same transaction as
    /// the signature itself.
    pub fn generate_signature(&mut self, data: &[u8], pin: &str, kind: SignatureKind) -> Result<Bytes> {
        let block = PinBlock::encode(pin)?;
        let digest = Sha1::digest(data);
        debug!(%kind, "Generating signature");

        let mut tx = self.executor.transaction()?;
        send(&mut *tx, &ManageSecurityEnvironment::signing(kind))?;
        send(&mut *tx, &Verify::new(&block))?;
        send(&mut *tx, &PerformSecurityOperation::compute_signature(&digest))
    }
}

/// Send `command` and decode the card's answer
fn send<E: Executor, C: EidCommand>(executor: &mut E, command: &C) -> Result<C::Output> {
    let response = executor.execute(command).context(C::NAME)?;
    log_status(C::NAME, response.status());
    C::parse(response)
}

fn log_status(command: &'static str, status: StatusWord) {
    let level = status.tracing_level();
    if level == Level::DEBUG {
        debug!(command, %status, "Card answered");
    } else if level == Level::INFO {
        info!(command, %status, description = status.description(), "Card answered");
    } else {
        warn!(command, %status, description = status.description(), "Card answered");
    }
}

fn block_offset(len: usize) -> Result<u16> {
    u16::try_from(len).map_err(|_| Error::InvalidData("file offset out of range"))
}

fn append_block(data: &mut BytesMut, block: &[u8], max_len: usize) -> Result<()> {
    let needed = data.len() + block.len();
    if needed > max_len {
        return Err(Error::BufferTooSmall {
            needed,
            actual: max_len,
        });
    }
    data.extend_from_slice(block);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::files;
    use beid_apdu_core::{CardExecutor, MockTransport};
    use hex_literal::hex;

    fn card(responses: Vec<Bytes>) -> EidCard<CardExecutor<MockTransport>> {
        EidCard::new(CardExecutor::new(MockTransport::new(responses)))
    }

    fn block(fill: u8, len: usize) -> Bytes {
        let mut data = vec![fill; len];
        data.extend_from_slice(&[0x90, 0x00]);
        data.into()
    }

    fn sent(card: &EidCard<CardExecutor<MockTransport>>) -> &[Bytes] {
        &card.executor().transport().commands
    }

    #[test]
    fn test_read_file_in_blocks() {
        let mut card = card(vec![
            Bytes::from_static(&[0x90, 0x00]),
            block(0x01, 0xF8),
            block(0x02, 0xF8),
            Bytes::from_static(&[0x6C, 0x10]),
            block(0x03, 0x10),
            Bytes::from_static(&[0x6B, 0x00]),
        ]);

        let data = card.read_file(files::IDENTITY, 1024).unwrap();
        assert_eq!(data.len(), 2 * 0xF8 + 0x10);
        assert!(data[..0xF8].iter().all(|&b| b == 0x01));
        assert!(data[2 * 0xF8..].iter().all(|&b| b == 0x03));

        let commands = sent(&card);
        assert_eq!(commands.len(), 5);
        assert_eq!(commands[0].as_ref(), &hex!("00A4080C063F00DF01403100"));
        assert_eq!(commands[1].as_ref(), &hex!("00B00000F8"));
        assert_eq!(commands[2].as_ref(), &hex!("00B000F8F8"));
        assert_eq!(commands[3].as_ref(), &hex!("00B001F0F8"));
        assert_eq!(commands[4].as_ref(), &hex!("00B001F010"));
        assert!(card.executor().transport().transactions_balanced());
    }

    #[test]
    fn test_read_file_stops_on_error_status() {
        let mut card = card(vec![
            Bytes::from_static(&[0x90, 0x00]),
            block(0xAA, 0xF8),
            Bytes::from_static(&[0x6B, 0x00]),
        ]);
        let data = card.read_file(files::ADDRESS_SIGNATURE, 256).unwrap();
        assert_eq!(data.len(), 0xF8);
    }

    #[test]
    fn test_read_file_failed_short_read() {
        let mut card = card(vec![
            Bytes::from_static(&[0x90, 0x00]),
            block(0x01, 0xF8),
            Bytes::from_static(&[0x6C, 0x10]),
            Bytes::from_static(&[0x69, 0x82]),
        ]);
        let err = card.read_file(files::IDENTITY, 1024).unwrap_err();
        assert!(matches!(err, Error::InvalidStatusWord(sw) if sw == StatusWord::new(0x69, 0x82)));
        assert_eq!(sent(&card)[3].as_ref(), &hex!("00B000F810"));
        assert!(card.executor().transport().transactions_balanced());
    }

    #[test]
    fn test_read_file_stops_on_empty_block() {
        let mut card = card(vec![
            Bytes::from_static(&[0x90, 0x00]),
            block(0xAA, 0x20),
            Bytes::from_static(&[0x90, 0x00]),
        ]);
        let data = card.read_file(files::ADDRESS, 512).unwrap();
        assert_eq!(data.len(), 0x20);
        assert_eq!(sent(&card).len(), 3);
    }

    #[test]
    fn test_read_file_too_large() {
        let mut card = card(vec![Bytes::from_static(&[0x90, 0x00]), block(0x01, 0xF8)]);
        let err = card.read_file(files::IDENTITY_SIGNATURE, 256).unwrap_err();
        assert!(matches!(err, Error::BufferTooSmall { needed: 0x1F0, actual: 256 }));
        assert!(card.executor().transport().transactions_balanced());
    }

    #[test]
    fn test_read_missing_file() {
        let mut card = card(vec![Bytes::from_static(&[0x6A, 0x82])]);
        let err = card.read_file(files::PHOTO, 4096).unwrap_err();
        assert!(matches!(err, Error::InvalidStatusWord(sw) if sw.is_file_not_found()));
        assert!(card.executor().transport().transactions_balanced());
    }

    #[test]
    fn test_verify_pin() {
        let mut card = card(vec![Bytes::from_static(&[0x90, 0x00])]);
        assert_eq!(card.verify_pin("1234").unwrap(), 3);
        assert_eq!(sent(&card)[0].as_ref(), &hex!("0020000108241234FFFFFFFFFF"));

        let mut card = self::card(vec![Bytes::from_static(&[0x63, 0xC2])]);
        assert!(matches!(card.verify_pin("0000"), Err(Error::WrongPin { remaining: 2 })));
        assert!(card.executor().transport().transactions_balanced());

        let mut card = self::card(vec![Bytes::from_static(&[0x69, 0x83])]);
        assert!(matches!(card.verify_pin("0000"), Err(Error::InvalidStatusWord(_))));
    }

    #[test]
    fn test_invalid_pin_sends_nothing() {
        let mut card = card(vec![Bytes::from_static(&[0x90, 0x00])]);
        assert!(matches!(card.verify_pin("12x4"), Err(Error::InvalidPin(_))));
        assert!(sent(&card).is_empty());
    }

    #[test]
    fn test_change_pin() {
        let mut card = card(vec![Bytes::from_static(&[0x90, 0x00])]);
        assert_eq!(card.change_pin("1234", "5678").unwrap(), 3);
        assert_eq!(
            sent(&card)[0].as_ref(),
            &hex!("0024000110 241234FFFFFFFFFF 245678FFFFFFFFFF")
        );
    }

    #[test]
    fn test_reactivate() {
        let mut card = card(vec![Bytes::from_static(&[0x90, 0x00])]);
        card.reactivate("123456", "654321").unwrap();
        assert_eq!(sent(&card)[0].as_ref(), &hex!("002C0001082C123456654321FF"));

        let mut card = self::card(vec![Bytes::from_static(&[0x63, 0xC0])]);
        assert!(matches!(
            card.reactivate("123456", "654321"),
            Err(Error::InvalidStatusWord(_))
        ));
    }

    #[test]
    fn test_challenge_and_response() {
        let mut card = card(vec![block(0x5A, 0x14), block(0xA5, 0x80)]);
        let challenge = card.challenge().unwrap();
        assert_eq!(challenge.len(), 0x14);

        let response = card.challenge_response(&challenge).unwrap();
        assert_eq!(response.len(), 0x80);
        assert_eq!(sent(&card)[1][..7], hex!("0088028116 9414"));
    }

    #[test]
    fn test_generate_signature() {
        let mut card = card(vec![
            Bytes::from_static(&[0x90, 0x00]),
            Bytes::from_static(&[0x90, 0x00]),
            block(0x42, 0x80),
        ]);
        let signature = card
            .generate_signature(b"hello", "1234", SignatureKind::NonRepudiation)
            .unwrap();
        assert_eq!(signature.len(), 0x80);

        let commands = sent(&card);
        assert_eq!(commands[0].as_ref(), &hex!("002241B6050480028483"));
        assert_eq!(commands[1].as_ref(), &hex!("0020000108241234FFFFFFFFFF"));
        assert_eq!(&commands[2][..5], &hex!("002A9E9A14"));
        assert_eq!(&commands[2][5..], Sha1::digest(b"hello").as_slice());
        assert_eq!(card.executor().transport().transactions_begun, 1);
        assert!(card.executor().transport().transactions_balanced());
    }

    #[test]
    fn test_generate_signature_wrong_pin() {
        let mut card = card(vec![
            Bytes::from_static(&[0x90, 0x00]),
            Bytes::from_static(&[0x63, 0xC1]),
        ]);
        let err = card
            .generate_signature(b"hello", "9999", SignatureKind::Authentication)
            .unwrap_err();
        assert_eq!(err.pin_tries_remaining(), Some(1));
        assert_eq!(sent(&card).len(), 2);
        assert!(card.executor().transport().transactions_balanced());
    }
}
