//! Shared fixtures: a simulated eID card, a test PKI and a stub fetcher
#![allow(dead_code, unreachable_pub)]

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use beid::constants::{FileId, files, identity_tags, address_tags};
use beid::{BeId, BeIdConfig, Error, RevocationFetcher, TlvRecord, TrustAnchors};
use beid_apdu_core::{CardTransport, MockDeviceManager, TransportError};
use bytes::Bytes;
use parking_lot::Mutex;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::EncodePublicKey;
use rsa::signature::{SignatureEncoding, Signer};
use rsa::{Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use sha1::{Digest, Sha1};
use yasna::models::ObjectIdentifier;
use yasna::{DERWriter, Tag};

pub const READER: &str = "ACS ACR38U 00 00";
pub const OCSP_URL: &str = "http://ocsp.eid.test";
pub const ROOT_CRL_URL: &str = "http://crl.eid.test/belgium4.crl";
pub const CITIZEN_CRL_URL: &str = "http://crl.eid.test/eidc.crl";
pub const PIN: &str = "1234";
pub const CITIZEN_PUK: &str = "111111";
pub const GOVERNMENT_PUK: &str = "222222";

/// Validity covering the present
pub const VALID: (&str, &str) = ("130101000000Z", "401231235959Z");

const OID_COMMON_NAME: &[u64] = &[2, 5, 4, 3];
const OID_ORGANIZATION: &[u64] = &[2, 5, 4, 10];
const OID_COUNTRY: &[u64] = &[2, 5, 4, 6];
const OID_SHA1_WITH_RSA: &[u64] = &[1, 2, 840, 113549, 1, 1, 5];
const OID_AUTHORITY_INFO_ACCESS: &[u64] = &[1, 3, 6, 1, 5, 5, 7, 1, 1];
const OID_OCSP: &[u64] = &[1, 3, 6, 1, 5, 5, 7, 48, 1];
const OID_OCSP_BASIC: &[u64] = &[1, 3, 6, 1, 5, 5, 7, 48, 1, 1];
const OID_CRL_DISTRIBUTION_POINTS: &[u64] = &[2, 5, 29, 31];

// ---------------------------------------------------------------------------
// Keys and certificates
// ---------------------------------------------------------------------------

/// RSA keys of the test PKI, generated once per test binary
pub struct Keys {
    pub root: RsaPrivateKey,
    pub ca: RsaPrivateKey,
    pub national_register: RsaPrivateKey,
    pub authentication: RsaPrivateKey,
    pub signature: RsaPrivateKey,
}

pub static KEYS: LazyLock<Keys> = LazyLock::new(|| {
    let mut rng = rand_v8::thread_rng();
    let mut key = || RsaPrivateKey::new(&mut rng, 1024).unwrap();
    Keys {
        root: key(),
        ca: key(),
        national_register: key(),
        authentication: key(),
        signature: key(),
    }
});

/// Distinguished name as (attribute, value) pairs
pub type Name = Vec<(&'static [u64], String)>;

pub fn name(common_name: &str, organization: Option<&str>, country: &str) -> Name {
    let mut name: Name = vec![(OID_COMMON_NAME, common_name.to_string())];
    if let Some(organization) = organization {
        name.push((OID_ORGANIZATION, organization.to_string()));
    }
    name.push((OID_COUNTRY, country.to_string()));
    name
}

fn write_name(w: DERWriter<'_>, name: &Name) {
    w.write_sequence(|w| {
        for (oid, value) in name {
            w.next().write_set(|w| {
                w.next().write_sequence(|w| {
                    w.next().write_oid(&ObjectIdentifier::from_slice(oid));
                    w.next().write_utf8_string(value);
                });
            });
        }
    });
}

fn write_time(w: DERWriter<'_>, time: &str) {
    w.write_tagged_implicit(yasna::tags::TAG_UTCTIME, |w| w.write_bytes(time.as_bytes()));
}

fn write_sha1_with_rsa(w: DERWriter<'_>) {
    w.write_sequence(|w| {
        w.next().write_oid(&ObjectIdentifier::from_slice(OID_SHA1_WITH_RSA));
        w.next().write_null();
    });
}

fn write_uri(w: DERWriter<'_>, uri: &str) {
    w.write_tagged_implicit(Tag::context(6), |w| w.write_bytes(uri.as_bytes()));
}

fn write_extension(w: DERWriter<'_>, oid: &[u64], value: &[u8]) {
    w.write_sequence(|w| {
        w.next().write_oid(&ObjectIdentifier::from_slice(oid));
        w.next().write_bytes(value);
    });
}

/// Wrap a to-be-signed structure with a SHA1withRSA signature by `key`
fn sign_structure(tbs: &[u8], key: &RsaPrivateKey) -> Vec<u8> {
    let signature = SigningKey::<Sha1>::new(key.clone()).sign(tbs).to_vec();
    yasna::construct_der(|w| {
        w.write_sequence(|w| {
            w.next().write_der(tbs);
            write_sha1_with_rsa(w.next());
            w.next().write_bitvec_bytes(&signature, signature.len() * 8);
        });
    })
}

/// Builder for test X.509 v3 certificates
#[derive(Clone)]
pub struct CertBuilder {
    pub subject: Name,
    pub issuer: Name,
    pub serial: Vec<u8>,
    pub not_before: String,
    pub not_after: String,
    pub ocsp_url: Option<String>,
    pub crl_url: Option<String>,
}

impl CertBuilder {
    pub fn new(subject: Name, issuer: Name, serial: &[u8]) -> Self {
        Self {
            subject,
            issuer,
            serial: serial.to_vec(),
            not_before: VALID.0.to_string(),
            not_after: VALID.1.to_string(),
            ocsp_url: None,
            crl_url: None,
        }
    }

    pub fn validity(mut self, not_before: &str, not_after: &str) -> Self {
        self.not_before = not_before.to_string();
        self.not_after = not_after.to_string();
        self
    }

    pub fn ocsp(mut self, url: &str) -> Self {
        self.ocsp_url = Some(url.to_string());
        self
    }

    pub fn crl(mut self, url: &str) -> Self {
        self.crl_url = Some(url.to_string());
        self
    }

    /// DER certificate for `public_key`, signed by `issuer_key`
    pub fn build(&self, public_key: &RsaPublicKey, issuer_key: &RsaPrivateKey) -> Vec<u8> {
        let spki = public_key.to_public_key_der().unwrap();
        let tbs = yasna::construct_der(|w| {
            w.write_sequence(|w| {
                w.next().write_tagged(Tag::context(0), |w| w.write_u8(2));
                w.next().write_bigint_bytes(&self.serial, true);
                write_sha1_with_rsa(w.next());
                write_name(w.next(), &self.issuer);
                w.next().write_sequence(|w| {
                    write_time(w.next(), &self.not_before);
                    write_time(w.next(), &self.not_after);
                });
                write_name(w.next(), &self.subject);
                w.next().write_der(spki.as_bytes());
                let extensions = self.extensions();
                if !extensions.is_empty() {
                    w.next().write_tagged(Tag::context(3), |w| {
                        w.write_sequence(|w| {
                            for (oid, value) in &extensions {
                                write_extension(w.next(), oid, value);
                            }
                        });
                    });
                }
            });
        });
        sign_structure(&tbs, issuer_key)
    }

    fn extensions(&self) -> Vec<(&'static [u64], Vec<u8>)> {
        let mut extensions = Vec::new();
        if let Some(url) = &self.ocsp_url {
            let value = yasna::construct_der(|w| {
                w.write_sequence(|w| {
                    w.next().write_sequence(|w| {
                        w.next().write_oid(&ObjectIdentifier::from_slice(OID_OCSP));
                        write_uri(w.next(), url);
                    });
                });
            });
            extensions.push((OID_AUTHORITY_INFO_ACCESS, value));
        }
        if let Some(url) = &self.crl_url {
            let value = yasna::construct_der(|w| {
                w.write_sequence(|w| {
                    w.next().write_sequence(|w| {
                        w.next().write_tagged(Tag::context(0), |w| {
                            w.write_tagged_implicit(Tag::context(0), |w| {
                                w.write_sequence(|w| write_uri(w.next(), url));
                            });
                        });
                    });
                });
            });
            extensions.push((OID_CRL_DISTRIBUTION_POINTS, value));
        }

        extensions
    }
}

/// DER CRL issued by `issuer`, listing `revoked` serials
pub fn build_crl(issuer: &Name, revoked: &[&[u8]], key: &RsaPrivateKey) -> Vec<u8> {
    let tbs = yasna::construct_der(|w| {
        w.write_sequence(|w| {
            w.next().write_u8(1);
            write_sha1_with_rsa(w.next());
            write_name(w.next(), issuer);
            write_time(w.next(), "240101000000Z");
            write_time(w.next(), "400101000000Z");
            if !revoked.is_empty() {
                w.next().write_sequence(|w| {
                    for serial in revoked {
                        w.next().write_sequence(|w| {
                            w.next().write_bigint_bytes(serial, true);
                            write_time(w.next(), "240601000000Z");
                        });
                    }
                });
            }
        });
    });
    sign_structure(&tbs, key)
}

/// DER OCSP response with one single response per `(serial, status)`
///
/// Status tags: 0 good, 1 revoked, 2 unknown.
pub fn build_ocsp_response(entries: &[(&[u8], u64)]) -> Vec<u8> {
    let basic = yasna::construct_der(|w| {
        w.write_sequence(|w| {
            w.next().write_sequence(|w| {
                w.next().write_tagged(Tag::context(1), |w| write_name(w, &name("OCSP", None, "BE")));
                w.next()
                    .write_tagged_implicit(yasna::tags::TAG_GENERALIZEDTIME, |w| w.write_bytes(b"20240101000000Z"));
                w.next().write_sequence(|w| {
                    for (serial, status) in entries {
                        w.next().write_sequence(|w| {
                            w.next().write_sequence(|w| {
                                w.next().write_sequence(|w| {
                                    w.next().write_oid(&ObjectIdentifier::from_slice(&[1, 3, 14, 3, 2, 26]));
                                    w.next().write_null();
                                });
                                w.next().write_bytes(&[0; 20]);
                                w.next().write_bytes(&[0; 20]);
                                w.next().write_bigint_bytes(serial, true);
                            });
                            if *status == 1 {
                                w.next().write_tagged_implicit(Tag::context(1), |w| {
                                    w.write_sequence(|w| {
                                        w.next().write_tagged_implicit(yasna::tags::TAG_GENERALIZEDTIME, |w| {
                                            w.write_bytes(b"20240601000000Z")
                                        });
                                    });
                                });
                            } else {
                                w.next().write_tagged_implicit(Tag::context(*status), |w| w.write_null());
                            }
                            w.next()
                                .write_tagged_implicit(yasna::tags::TAG_GENERALIZEDTIME, |w| w.write_bytes(b"20240101000000Z"));
                        });
                    }
                });
            });
            write_sha1_with_rsa(w.next());
            w.next().write_bitvec_bytes(&[0; 128], 1024);
        });
    });

    yasna::construct_der(|w| {
        w.write_sequence(|w| {
            w.next().write_enum(0);
            w.next().write_tagged(Tag::context(0), |w| {
                w.write_sequence(|w| {
                    w.next().write_oid(&ObjectIdentifier::from_slice(OID_OCSP_BASIC));
                    w.next().write_bytes(&basic);
                });
            });
        });
    })
}

/// Certificates of a well-formed card
pub struct TestPki {
    pub root_name: Name,
    pub ca_name: Name,
    pub root: Vec<u8>,
    pub ca: Vec<u8>,
    pub authentication: Vec<u8>,
    pub signature: Vec<u8>,
    pub national_register: Vec<u8>,
}

pub const AUTHENTICATION_SERIAL: &[u8] = &[0x10, 0x01];
pub const SIGNATURE_SERIAL: &[u8] = &[0x10, 0x02];
pub const CA_SERIAL: &[u8] = &[0x02];
pub const NATIONAL_REGISTER_SERIAL: &[u8] = &[0x03];

impl TestPki {
    pub fn new() -> Self {
        let keys = &*KEYS;
        let root_name = name("Belgium Root CA4", None, "BE");
        let ca_name = name("Citizen CA", None, "BE");
        let holder = |role: &str| name(&format!("Alice Peeters ({role})"), None, "BE");

        let root = CertBuilder::new(root_name.clone(), root_name.clone(), &[0x01])
            .build(&keys.root.to_public_key(), &keys.root);
        let ca = CertBuilder::new(ca_name.clone(), root_name.clone(), CA_SERIAL)
            .crl(ROOT_CRL_URL)
            .build(&keys.ca.to_public_key(), &keys.root);
        let authentication = CertBuilder::new(holder("Authentication"), ca_name.clone(), AUTHENTICATION_SERIAL)
            .ocsp(OCSP_URL)
            .crl(CITIZEN_CRL_URL)
            .build(&keys.authentication.to_public_key(), &keys.ca);
        let signature = CertBuilder::new(holder("Signature"), ca_name.clone(), SIGNATURE_SERIAL)
            .ocsp(OCSP_URL)
            .crl(CITIZEN_CRL_URL)
            .build(&keys.signature.to_public_key(), &keys.ca);
        let national_register = CertBuilder::new(name("RRN", Some("RRN"), "BE"), root_name.clone(), NATIONAL_REGISTER_SERIAL)
            .crl(ROOT_CRL_URL)
            .build(&keys.national_register.to_public_key(), &keys.root);

        Self {
            root_name,
            ca_name,
            root,
            ca,
            authentication,
            signature,
            national_register,
        }
    }

    /// Trust anchors accepting this PKI's root
    pub fn anchors(&self) -> TrustAnchors {
        TrustAnchors::new().with_primary(self.root.clone())
    }
}

// ---------------------------------------------------------------------------
// Card contents
// ---------------------------------------------------------------------------

pub const PHOTO: &[u8] = b"\xFF\xD8\xFF\xE0 simulated jpeg \xFF\xD9";

pub fn sha1(data: &[u8]) -> [u8; 20] {
    Sha1::digest(data).into()
}

pub fn sign_with(key: &RsaPrivateKey, data: &[u8]) -> Vec<u8> {
    SigningKey::<Sha1>::new(key.clone()).sign(data).to_vec()
}

/// Identity file holding `photo_hash`
pub fn identity_file(photo_hash: &[u8]) -> Vec<u8> {
    let mut tlv = TlvRecord::new();
    let fields: [(u8, &[u8]); 15] = [
        (identity_tags::CARD_NUMBER, b"590123456789"),
        (identity_tags::CHIP_NUMBER, &[0x53, 0x4C, 0x49, 0x4E, 0x33, 0x66, 0x00, 0x29, 0x6C, 0xFF, 0x26, 0x23, 0x66, 0x0B, 0x08, 0x26]),
        (identity_tags::VALIDITY_BEGIN, b"01.01.2020"),
        (identity_tags::VALIDITY_END, b"01.01.2030"),
        (identity_tags::DELIVERY_MUNICIPALITY, b"Brussel"),
        (identity_tags::NATIONAL_NUMBER, b"85010112345"),
        (identity_tags::NAME, b"Peeters"),
        (identity_tags::FIRST_NAMES, b"Alice Maria"),
        (identity_tags::THIRD_INITIAL, b"J"),
        (identity_tags::NATIONALITY, b"Belg"),
        (identity_tags::BIRTH_PLACE, b"Gent"),
        (identity_tags::BIRTH_DATE, b"01 JAN 1985"),
        (identity_tags::SEX, b"V"),
        (identity_tags::DOCUMENT_TYPE, b"1"),
        (identity_tags::SPECIAL_STATUS, b"0"),
    ];
    for (tag, value) in fields {
        tlv.insert(tag, Bytes::copy_from_slice(value));
    }
    tlv.insert(identity_tags::PHOTO_HASH, Bytes::copy_from_slice(photo_hash));
    tlv.encode().to_vec()
}

/// Address file, zero padded as stored on the card
pub fn address_file() -> Vec<u8> {
    let mut tlv = TlvRecord::new();
    tlv.insert(address_tags::STREET, Bytes::from_static(b"Wetstraat 16"));
    tlv.insert(address_tags::ZIP_CODE, Bytes::from_static(b"1000"));
    tlv.insert(address_tags::MUNICIPALITY, Bytes::from_static(b"Brussel"));
    let mut data = tlv.encode().to_vec();
    data.resize(data.len() + 32, 0x00);
    data
}

pub fn card_data() -> Vec<u8> {
    let mut data = vec![0xA5; 16];
    data.extend_from_slice(&[0x01, 0x02, 0x03, 0x04, 0x05, 0x17, 0xFF, 0x06, 0x07, 0x08, 0x09, 0x0F]);
    data
}

pub fn token_info() -> Vec<u8> {
    let mut data = vec![0x00; 0x25];
    data.extend_from_slice(&[0x11, 0x22, 0x33, 0x44]);
    data
}

// ---------------------------------------------------------------------------
// Simulated card
// ---------------------------------------------------------------------------

/// Mutable state of a simulated card
#[derive(Debug, Default)]
pub struct CardState {
    pub files: HashMap<[u8; 6], Vec<u8>>,
    pub selected: Option<[u8; 6]>,
    pub pin: String,
    pub puk: String,
    pub tries: u8,
    pub pin_verified: bool,
    pub key_reference: Option<u8>,
    pub keys: HashMap<u8, RsaPrivateKey>,
    pub challenge: Vec<u8>,
    pub card_data: Vec<u8>,
    pub commands: Vec<Vec<u8>>,
    pub transactions_begun: usize,
    pub transactions_ended: usize,
    pub removed: bool,
}

/// In-memory eID card; clones share state
#[derive(Debug, Clone, Default)]
pub struct SimulatedCard {
    pub state: Arc<Mutex<CardState>>,
}

impl SimulatedCard {
    /// A card with a valid PKI and signed records
    pub fn new(pki: &TestPki) -> Self {
        let keys = &*KEYS;
        let identity = identity_file(&sha1(PHOTO));
        let identity_signature = sign_with(&keys.national_register, &identity);
        let address = address_file();
        let trimmed = beid::types::trim_padding(&address);
        let address_signature = sign_with(&keys.national_register, &[trimmed, &identity_signature[..]].concat());

        let card = Self::default();
        {
            let mut state = card.state.lock();
            state.pin = PIN.to_string();
            state.puk = format!("{CITIZEN_PUK}{GOVERNMENT_PUK}");
            state.tries = 3;
            state.challenge = (0..20).collect();
            state.card_data = card_data();
            state.keys.insert(0x82, keys.authentication.clone());
            state.keys.insert(0x83, keys.signature.clone());
        }
        card.set_file(files::IDENTITY, identity);
        card.set_file(files::IDENTITY_SIGNATURE, identity_signature);
        card.set_file(files::ADDRESS, address);
        card.set_file(files::ADDRESS_SIGNATURE, address_signature);
        card.set_file(files::PHOTO, PHOTO.to_vec());
        card.set_file(files::TOKEN_INFO, token_info());
        card.set_file(files::ROOT_CERTIFICATE, pki.root.clone());
        card.set_file(files::CA_CERTIFICATE, pki.ca.clone());
        card.set_file(files::AUTHENTICATION_CERTIFICATE, pki.authentication.clone());
        card.set_file(files::SIGNATURE_CERTIFICATE, pki.signature.clone());
        card.set_file(files::NATIONAL_REGISTER_CERTIFICATE, pki.national_register.clone());
        card
    }

    pub fn set_file(&self, file: FileId, contents: Vec<u8>) {
        self.state.lock().files.insert(file.path(), contents);
    }

    pub fn commands(&self) -> Vec<Vec<u8>> {
        self.state.lock().commands.clone()
    }

    pub fn transactions_balanced(&self) -> bool {
        let state = self.state.lock();
        state.transactions_begun == state.transactions_ended
    }

    fn respond(state: &mut CardState, command: &[u8]) -> Vec<u8> {
        let [_, ins, p1, p2, ..] = *command else {
            return vec![0x67, 0x00];
        };
        let data = command.get(5..5 + command.get(4).copied().unwrap_or(0) as usize).unwrap_or(&[]);

        match ins {
            0xA4 => match <[u8; 6]>::try_from(data) {
                Ok(path) if state.files.contains_key(&path) => {
                    state.selected = Some(path);
                    vec![0x90, 0x00]
                }
                _ => vec![0x6A, 0x82],
            },
            0xB0 => {
                let Some(file) = state.selected.and_then(|path| state.files.get(&path)) else {
                    return vec![0x69, 0x86];
                };
                let offset = u16::from_be_bytes([p1, p2]) as usize;
                let wanted = command[4] as usize;
                let remaining = file.len().saturating_sub(offset);
                if remaining == 0 {
                    vec![0x6B, 0x00]
                } else if remaining < wanted {
                    vec![0x6C, remaining as u8]
                } else {
                    with_success(&file[offset..offset + wanted])
                }
            }
            0x20 => Self::check_pin(state, data),
            0x24 => {
                let response = Self::check_pin(state, &data[..8]);
                if response == [0x90, 0x00] {
                    state.pin = pin_digits(&data[8..]);
                }
                response
            }
            0x2C => {
                if pin_digits(data) == state.puk {
                    state.tries = 3;
                    vec![0x90, 0x00]
                } else {
                    vec![0x69, 0x82]
                }
            }
            0x84 => with_success(&state.challenge),
            0x88 => with_success(&[0x5A; 0x80]),
            0xE4 => with_success(&state.card_data),
            0x22 => {
                state.key_reference = data.last().copied();
                vec![0x90, 0x00]
            }
            0x2A => {
                let key = state.key_reference.and_then(|reference| state.keys.get(&reference));
                match key {
                    Some(key) if state.pin_verified => {
                        with_success(&key.sign(Pkcs1v15Sign::new::<Sha1>(), data).unwrap())
                    }
                    _ => vec![0x69, 0x82],
                }
            }
            _ => vec![0x6D, 0x00],
        }
    }

    fn check_pin(state: &mut CardState, block: &[u8]) -> Vec<u8> {
        if state.tries == 0 {
            return vec![0x69, 0x83];
        }
        if pin_digits(block) == state.pin {
            state.tries = 3;
            state.pin_verified = true;
            vec![0x90, 0x00]
        } else {
            state.tries -= 1;
            state.pin_verified = false;
            vec![0x63, 0xC0 | state.tries]
        }
    }
}

fn with_success(data: &[u8]) -> Vec<u8> {
    [data, &[0x90, 0x00]].concat()
}

/// Digits carried by a PIN block
fn pin_digits(block: &[u8]) -> String {
    let Some((&control, packed)) = block.split_first() else {
        return String::new();
    };
    let nibbles = control.saturating_sub(0x20) as usize;
    hex::encode_upper(packed)
        .chars()
        .take(nibbles)
        .filter(|&c| c != 'F')
        .collect()
}

impl CardTransport for SimulatedCard {
    fn do_transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, TransportError> {
        let mut state = self.state.lock();
        if state.removed {
            return Err(TransportError::CardRemoved);
        }
        state.commands.push(command.to_vec());
        Ok(Self::respond(&mut state, command).into())
    }

    fn is_connected(&self) -> bool {
        !self.state.lock().removed
    }

    fn atr(&self) -> Result<Bytes, TransportError> {
        Ok(Bytes::from_static(&[0x3B, 0x98, 0x13, 0x40, 0x0A, 0xA5, 0x03, 0x01, 0x01, 0x01, 0xAD, 0x13, 0x11]))
    }

    fn reset(&mut self) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        state.selected = None;
        state.pin_verified = false;
        Ok(())
    }

    fn begin_transaction(&mut self) -> Result<(), TransportError> {
        self.state.lock().transactions_begun += 1;
        Ok(())
    }

    fn end_transaction(&mut self) -> Result<(), TransportError> {
        self.state.lock().transactions_ended += 1;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Revocation fetcher
// ---------------------------------------------------------------------------

/// Fetcher answering from a table of URL prefixes
#[derive(Debug, Clone, Default)]
pub struct StubFetcher {
    responses: Arc<Mutex<Vec<(String, Option<Bytes>)>>>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl StubFetcher {
    /// Answer URLs starting with `prefix` with `body`
    pub fn with(self, prefix: &str, body: impl Into<Bytes>) -> Self {
        self.responses.lock().push((prefix.to_string(), Some(body.into())));
        self
    }

    /// Fail requests for URLs starting with `prefix`
    pub fn failing(self, prefix: &str) -> Self {
        self.responses.lock().push((prefix.to_string(), None));
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }
}

impl RevocationFetcher for StubFetcher {
    fn get(&self, url: &str) -> beid::Result<Bytes> {
        self.requests.lock().push(url.to_string());
        self.responses
            .lock()
            .iter()
            .find(|(prefix, _)| url.starts_with(prefix.as_str()))
            .and_then(|(_, body)| body.clone())
            .ok_or_else(|| Error::RevocationCheckFailed(format!("unreachable: {url}")))
    }
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

pub type TestBeId = BeId<MockDeviceManager<SimulatedCard>>;

/// Configuration without delays, trusting `anchors`
pub fn config(anchors: TrustAnchors) -> BeIdConfig {
    BeIdConfig::new()
        .with_trust_anchors(anchors)
        .with_read_settle_delay(std::time::Duration::ZERO)
        .with_presence_waits(std::time::Duration::from_millis(20), std::time::Duration::from_millis(20))
}

/// Controller over one reader holding `card`
pub fn controller(card: &SimulatedCard, config: BeIdConfig, fetcher: StubFetcher) -> TestBeId {
    let manager = MockDeviceManager::new().with_card(READER, card.clone());
    BeId::new(manager, config).unwrap().with_fetcher(fetcher)
}
