//! eID controller
//!
//! [`BeId`] owns the connection to a card, reads its records and checks
//! them against the trust chain before handing them out.

use std::sync::Arc;

use beid_apdu_core::DeviceManager;
use bytes::Bytes;
use chrono::Utc;
use parking_lot::MutexGuard;
use tracing::{debug, instrument, warn};

use crate::certificate::{Certificate, CertificateChain, CertificateRole};
use crate::commands::SignatureKind;
use crate::config::BeIdConfig;
use crate::constants::{files, limits};
use crate::error::{CardAbsence, Error, Result};
use crate::monitor::{CardEventReceiver, PresenceMonitor};
use crate::revocation::{self, HttpFetcher, RevocationFetcher};
use crate::session::{CardGuard, ConnectedCard, Session, SharedSession};
use crate::types::{AddressRecord, IdentityRecord, PhotoRecord, VersionRecord, trim_padding};

/// Belgian eID card reached through a [`DeviceManager`]
///
/// Every operation connects on demand. Records are only returned once the
/// card's root is pinned and the national register signature checks out,
/// unless test-card mode is enabled.
#[derive(Debug)]
pub struct BeId<M: DeviceManager> {
    manager: Arc<M>,
    config: BeIdConfig,
    session: SharedSession<M::Transport>,
    fetcher: Arc<dyn RevocationFetcher>,
}

impl<M: DeviceManager> BeId<M> {
    /// Create a controller over `manager`
    ///
    /// Without trust anchors every card record is rejected unless test-card
    /// mode is enabled.
    pub fn new(manager: M, config: BeIdConfig) -> Result<Self> {
        if config.trust_anchors.is_empty() && !config.test_card {
            warn!("No trust anchors configured, card records will fail root verification");
        }
        let fetcher = HttpFetcher::new(config.http_timeout)?;
        Ok(Self {
            manager: Arc::new(manager),
            config,
            session: Session::shared(),
            fetcher: Arc::new(fetcher),
        })
    }

    /// Use `fetcher` for OCSP and CRL downloads
    pub fn with_fetcher(mut self, fetcher: impl RevocationFetcher + 'static) -> Self {
        self.fetcher = Arc::new(fetcher);
        self
    }

    /// Active configuration
    pub const fn config(&self) -> &BeIdConfig {
        &self.config
    }

    /// Device manager used to reach readers
    pub fn manager(&self) -> &M {
        &self.manager
    }

    /// Session shared with the presence monitor
    pub fn session(&self) -> SharedSession<M::Transport> {
        Arc::clone(&self.session)
    }

    /// Connect to a card unless already connected
    pub fn connect(&self) -> Result<()> {
        self.card().map(drop)
    }

    /// Drop the connection, if any
    pub fn disconnect(&self) {
        self.session.lock().disconnect();
    }

    /// Whether a card is connected
    pub fn is_connected(&self) -> bool {
        self.session.lock().is_connected()
    }

    /// Exclusive handle on the connected card, connecting first if needed
    ///
    /// The session stays locked while the handle lives, so several card
    /// operations can run without another thread interleaving.
    pub fn card(&self) -> Result<CardGuard<'_, M::Transport>> {
        let mut session = self.session.lock();
        self.open(&mut session)?;
        MutexGuard::try_map(session, Session::card_mut)
            .map_err(|_| Error::CardNotConnected(CardAbsence::NotConnected))
    }

    /// Watch for card insertion and removal on a background thread
    ///
    /// The monitor connects this controller's session to inserted cards and
    /// disconnects it on removal.
    pub fn monitor(&self) -> (PresenceMonitor, CardEventReceiver)
    where
        M: 'static,
    {
        PresenceMonitor::spawn(Arc::clone(&self.manager), Arc::clone(&self.session), &self.config)
    }

    fn open<'s>(&self, session: &'s mut Session<M::Transport>) -> Result<&'s mut ConnectedCard<M::Transport>> {
        session.connect(
            &*self.manager,
            self.config.reader_name.as_deref(),
            self.config.read_settle_delay,
        )
    }

    /// Run `operation` on the connected card
    ///
    /// A card found missing during the operation ends the session.
    fn with_card<R>(&self, operation: impl FnOnce(&mut ConnectedCard<M::Transport>) -> Result<R>) -> Result<R> {
        let mut session = self.session.lock();
        let result = operation(self.open(&mut session)?);
        if let Err(e) = &result
            && e.is_card_gone()
        {
            warn!(error = %e, "Card lost during operation");
            session.disconnect();
        }
        result
    }

    /// Answer To Reset of the connected card
    pub fn atr(&self) -> Result<Bytes> {
        self.with_card(|card| Ok(card.atr().clone()))
    }

    /// Name of the reader holding the connected card
    pub fn reader_name(&self) -> Result<String> {
        self.with_card(|card| Ok(card.reader().to_string()))
    }

    /// Identity record, checked against the national register signature
    #[instrument(level = "debug", skip(self))]
    pub fn identity(&self) -> Result<IdentityRecord> {
        self.with_card(|card| self.read_identity(card))
    }

    /// Address record, checked against the national register signature
    ///
    /// The address signature covers the trimmed address followed by the
    /// identity signature.
    #[instrument(level = "debug", skip(self))]
    pub fn address(&self) -> Result<AddressRecord> {
        self.with_card(|card| {
            let identity_signature = card.read_file(files::IDENTITY_SIGNATURE, limits::SIGNATURE)?;
            let signature = card.read_file(files::ADDRESS_SIGNATURE, limits::SIGNATURE)?;
            let data = card.read_file(files::ADDRESS, limits::ADDRESS)?;
            let address = trim_padding(&data);

            self.check_root(card)?;
            let signed = [address, &identity_signature[..]].concat();
            self.check_record_signature(card, &signed, &signature, "address")?;

            AddressRecord::decode(address)
        })
    }

    /// Photo, checked against the hash in the verified identity record
    #[instrument(level = "debug", skip(self))]
    pub fn photo(&self) -> Result<PhotoRecord> {
        self.with_card(|card| {
            let photo = PhotoRecord::new(card.read_file(files::PHOTO, limits::PHOTO)?);
            self.check_root(card)?;

            let identity = self.read_identity(card)?;
            photo.verify_hash(&identity.photo_hash)?;
            Ok(photo)
        })
    }

    /// Chip and applet versions
    #[instrument(level = "debug", skip(self))]
    pub fn version_info(&self) -> Result<VersionRecord> {
        self.with_card(|card| {
            let card_data = card.card_data()?;
            let token_info = card.read_file(files::TOKEN_INFO, limits::TOKEN_INFO)?;
            VersionRecord::parse(&card_data, &token_info)
        })
    }

    /// Raw card data block
    pub fn card_data(&self) -> Result<Bytes> {
        self.with_card(|card| card.card_data())
    }

    /// Certificate stored for `role`, unverified
    pub fn certificate(&self, role: CertificateRole) -> Result<Certificate> {
        self.with_card(|card| read_certificate(card, role))
    }

    /// Root, CA, authentication and signature certificates, checked for validity now
    #[instrument(level = "debug", skip(self))]
    pub fn certificate_chain(&self) -> Result<CertificateChain> {
        let mut chain = self.with_card(|card| {
            CertificateChain::new(
                read_certificate(card, CertificateRole::Root)?,
                read_certificate(card, CertificateRole::Ca)?,
                read_certificate(card, CertificateRole::Authentication)?,
                read_certificate(card, CertificateRole::Signature)?,
            )
        })?;

        if !chain.verify(Utc::now()) {
            warn!("Certificate chain is not valid at this time");
        }
        Ok(chain)
    }

    /// National register certificate, checked for validity and subject
    #[instrument(level = "debug", skip(self))]
    pub fn national_register_certificate(&self) -> Result<Certificate> {
        let mut certificate = self.certificate(CertificateRole::NationalRegister)?;
        if !certificate.verify_national_register(Utc::now()) {
            warn!(subject = certificate.subject(), status = %certificate.status(), "National register certificate rejected");
        }
        Ok(certificate)
    }

    /// Root certificate, pinned against the trust anchors and checked for validity
    ///
    /// A root that is not a trust anchor comes back as
    /// [`crate::CertificateStatus::InvalidRoot`].
    #[instrument(level = "debug", skip(self))]
    pub fn verify_root(&self) -> Result<Certificate> {
        let mut root = self.certificate(CertificateRole::Root)?;
        if self.config.test_card || self.config.trust_anchors.check(&mut root) {
            root.verify(Utc::now());
        }
        debug!(status = %root.status(), "Root checked");
        Ok(root)
    }

    /// Check the authentication and signature certificates with OCSP
    pub fn verify_ocsp(&self, chain: &mut CertificateChain) -> bool {
        revocation::verify_ocsp(chain, self.fetcher.as_ref())
    }

    /// Check the chain and the national register certificate against their CRLs
    pub fn verify_crl(&self, chain: &mut CertificateChain, national_register: &mut Certificate) -> bool {
        revocation::verify_crl(chain, national_register, self.fetcher.as_ref())
    }

    /// Sign `data` with the key for `kind`, after verifying `pin`
    #[instrument(level = "debug", skip(self, data, pin))]
    pub fn generate_signature(&self, data: &[u8], pin: &str, kind: SignatureKind) -> Result<Bytes> {
        self.with_card(|card| card.generate_signature(data, pin, kind))
    }

    /// Check a signature made by the card's key for `kind`
    ///
    /// The certifying certificate is read from the connected card. Use
    /// [`Self::verify_signature_with`] once the certificate is at hand.
    #[instrument(level = "debug", skip(self, data, signature))]
    pub fn verify_signature(&self, data: &[u8], signature: &[u8], kind: SignatureKind) -> Result<bool> {
        let certificate = self.certificate(kind.certificate_role())?;
        Self::verify_signature_with(&certificate, data, signature)
    }

    /// Check a signature against `certificate` without touching the card
    pub fn verify_signature_with(certificate: &Certificate, data: &[u8], signature: &[u8]) -> Result<bool> {
        let valid = certificate.verify_signed(data, signature)?;
        debug!(role = %certificate.role(), valid, "Signature checked");
        Ok(valid)
    }

    /// Verify the cardholder PIN, returning the remaining tries
    pub fn verify_pin(&self, pin: &str) -> Result<u8> {
        self.with_card(|card| card.verify_pin(pin))
    }

    /// Replace the cardholder PIN, returning the remaining tries
    pub fn change_pin(&self, current: &str, new: &str) -> Result<u8> {
        self.with_card(|card| card.change_pin(current, new))
    }

    /// Unblock the PIN with the citizen and government PUKs
    pub fn reactivate(&self, citizen_puk: &str, government_puk: &str) -> Result<()> {
        self.with_card(|card| card.reactivate(citizen_puk, government_puk))
    }

    /// Random bytes generated by the card
    pub fn challenge(&self) -> Result<Bytes> {
        self.with_card(|card| card.challenge())
    }

    /// Signature of `challenge` with the authentication key
    pub fn challenge_response(&self, challenge: &[u8]) -> Result<Bytes> {
        self.with_card(|card| card.challenge_response(challenge))
    }

    fn read_identity(&self, card: &mut ConnectedCard<M::Transport>) -> Result<IdentityRecord> {
        let data = card.read_file(files::IDENTITY, limits::IDENTITY)?;
        let signature = card.read_file(files::IDENTITY_SIGNATURE, limits::SIGNATURE)?;

        self.check_root(card)?;
        self.check_record_signature(card, &data, &signature, "identity")?;

        IdentityRecord::decode(&data)
    }

    /// Fail unless the card's root is a trust anchor
    fn check_root(&self, card: &mut ConnectedCard<M::Transport>) -> Result<()> {
        if self.config.test_card {
            return Ok(());
        }
        let mut root = read_certificate(card, CertificateRole::Root)?;
        if self.config.trust_anchors.check(&mut root) {
            Ok(())
        } else {
            Err(Error::RootVerificationFailed)
        }
    }

    /// Fail unless the national register signed `data`
    fn check_record_signature(
        &self,
        card: &mut ConnectedCard<M::Transport>,
        data: &[u8],
        signature: &[u8],
        record: &'static str,
    ) -> Result<()> {
        if self.config.test_card {
            return Ok(());
        }
        let mut certificate = read_certificate(card, CertificateRole::NationalRegister)?;
        if !certificate.verify_national_register(Utc::now()) {
            warn!(record, status = %certificate.status(), "National register certificate rejected");
            return Err(Error::SignatureVerificationFailed(record));
        }
        if !matches!(certificate.verify_signed(data, signature), Ok(true)) {
            warn!(record, "Record signature does not verify");
            return Err(Error::SignatureVerificationFailed(record));
        }
        Ok(())
    }
}

#[cfg(feature = "pcsc")]
impl BeId<beid_apdu_transport_pcsc::PcscDeviceManager> {
    /// Create a controller over the system's PC/SC readers
    pub fn pcsc(config: BeIdConfig) -> Result<Self> {
        let manager = beid_apdu_transport_pcsc::PcscDeviceManager::new()
            .map_err(beid_apdu_core::TransportError::from)?;
        Self::new(manager, config)
    }
}

fn read_certificate<T: beid_apdu_core::CardTransport>(
    card: &mut ConnectedCard<T>,
    role: CertificateRole,
) -> Result<Certificate> {
    Certificate::new(role, card.read_file(role.file(), limits::CERTIFICATE)?)
}
