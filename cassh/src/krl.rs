// SPDX-License-Identifier: MIT
// Copyright (c) Microsoft Corporation.

//! Parsing of OpenSSH key revocation lists (KRLs).
//!
//! The format is described in OpenSSH's `PROTOCOL.krl`. A KRL is a header followed by a series
//! of sections, each revoking certificates (by serial number or key ID, scoped to a CA), plain
//! keys, or key fingerprints. Signature sections, if any, come last.
//!
//! Signatures are parsed but not verified.

use std::collections::{BTreeSet, HashSet};
use std::ops::RangeInclusive;

use bytes::Buf;
use chrono::{DateTime, Utc};
use ssh_key::{public::KeyData, Certificate, PublicKey};

const MAGIC: u64 = 0x5353_484b_524c_0a00;
const FORMAT_VERSION: u32 = 1;

const SECTION_CERTIFICATES: u8 = 1;
const SECTION_EXPLICIT_KEY: u8 = 2;
const SECTION_FINGERPRINT_SHA1: u8 = 3;
const SECTION_SIGNATURE: u8 = 4;
const SECTION_FINGERPRINT_SHA256: u8 = 5;

const CERT_SECTION_SERIAL_LIST: u8 = 0x20;
const CERT_SECTION_SERIAL_RANGE: u8 = 0x21;
const CERT_SECTION_SERIAL_BITMAP: u8 = 0x22;
const CERT_SECTION_KEY_ID: u8 = 0x23;

/// Errors encountered while parsing or querying a KRL.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("bad magic number")]
    BadMagic,

    #[error("unsupported format version {0}")]
    UnsupportedFormatVersion(u32),

    #[error("truncated {0}")]
    Truncated(&'static str),

    #[error("unknown section type {0:#04x}")]
    UnknownSection(u8),

    #[error("unknown certificate section type {0:#04x}")]
    UnknownCertificateSection(u8),

    #[error("{0} has trailing data")]
    TrailingData(&'static str),

    #[error("invalid serial range {min}-{max}")]
    InvalidSerialRange { min: u64, max: u64 },

    #[error("negative serial bitmap")]
    NegativeBitmap,

    #[error("invalid {kind} fingerprint of length {length}")]
    FingerprintLength { kind: &'static str, length: usize },

    #[error("section {0:#04x} follows a signature")]
    SectionAfterSignature(u8),

    #[error("invalid {what}: {source}")]
    InvalidKey {
        what: &'static str,
        #[source]
        source: ssh_key::Error,
    },
}

/// A parsed key revocation list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRevocationList {
    version: u64,
    generated_date: u64,
    flags: u64,
    comment: String,
    certificates: Vec<CertificateSection>,
    revoked_keys: HashSet<Vec<u8>>,
    revoked_sha1: HashSet<Vec<u8>>,
    revoked_sha256: HashSet<Vec<u8>>,
    signatures: Vec<Signature>,
}

/// Certificates revoked on behalf of a single certificate authority.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CertificateSection {
    /// The CA the section applies to; `None` applies to certificates from any CA.
    ca_key: Option<KeyData>,
    serials: BTreeSet<u64>,
    serial_ranges: Vec<RangeInclusive<u64>>,
    // Each entry is an offset and a big-endian bitmap where bit N revokes serial offset + N.
    serial_bitmaps: Vec<(u64, Vec<u8>)>,
    key_ids: HashSet<Vec<u8>>,
}

/// A signature over the KRL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub signing_key: PublicKey,
    pub signature: Vec<u8>,
}

impl KeyRevocationList {
    /// Parse a binary KRL.
    pub fn parse(mut buf: &[u8]) -> Result<Self, Error> {
        let buf = &mut buf;
        if read_u64(buf, "magic")? != MAGIC {
            return Err(Error::BadMagic);
        }
        let format_version = read_u32(buf, "format version")?;
        if format_version != FORMAT_VERSION {
            return Err(Error::UnsupportedFormatVersion(format_version));
        }

        let mut krl = KeyRevocationList {
            version: read_u64(buf, "krl version")?,
            generated_date: read_u64(buf, "generated date")?,
            flags: read_u64(buf, "flags")?,
            comment: String::new(),
            certificates: vec![],
            revoked_keys: HashSet::new(),
            revoked_sha1: HashSet::new(),
            revoked_sha256: HashSet::new(),
            signatures: vec![],
        };
        let _reserved = read_string(buf, "reserved")?;
        krl.comment = String::from_utf8_lossy(read_string(buf, "comment")?).into_owned();

        while buf.has_remaining() {
            let section_type = read_u8(buf, "section type")?;
            let mut section = read_string(buf, "section")?;
            if !krl.signatures.is_empty() && section_type != SECTION_SIGNATURE {
                return Err(Error::SectionAfterSignature(section_type));
            }

            match section_type {
                SECTION_CERTIFICATES => {
                    let certificates = CertificateSection::parse(&mut section)?;
                    krl.certificates.push(certificates);
                }
                SECTION_EXPLICIT_KEY => {
                    while section.has_remaining() {
                        let blob = read_string(&mut section, "explicit key")?;
                        krl.revoked_keys.insert(blob.to_vec());
                    }
                }
                SECTION_FINGERPRINT_SHA1 => {
                    read_fingerprints(&mut section, "sha1", 20, &mut krl.revoked_sha1)?;
                }
                SECTION_FINGERPRINT_SHA256 => {
                    read_fingerprints(&mut section, "sha256", 32, &mut krl.revoked_sha256)?;
                }
                SECTION_SIGNATURE => {
                    let signing_key = read_string(&mut section, "signing key")?;
                    let signing_key =
                        PublicKey::from_bytes(signing_key).map_err(|source| Error::InvalidKey {
                            what: "signing key",
                            source,
                        })?;
                    let signature = read_string(&mut section, "signature")?.to_vec();
                    if section.has_remaining() {
                        return Err(Error::TrailingData("signature section"));
                    }
                    krl.signatures.push(Signature {
                        signing_key,
                        signature,
                    });
                }
                other => return Err(Error::UnknownSection(other)),
            }
        }

        tracing::trace!(
            version = krl.version,
            certificate_sections = krl.certificates.len(),
            revoked_keys = krl.revoked_keys.len(),
            signatures = krl.signatures.len(),
            "Parsed key revocation list"
        );
        Ok(krl)
    }

    /// The KRL version number, incremented by the issuer on each change.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// When the KRL was generated, or `None` if the timestamp is out of range.
    pub fn generated_date(&self) -> Option<DateTime<Utc>> {
        i64::try_from(self.generated_date)
            .ok()
            .and_then(|seconds| DateTime::from_timestamp(seconds, 0))
    }

    /// Reserved for future use; currently always zero.
    pub fn flags(&self) -> u64 {
        self.flags
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    pub fn certificate_sections(&self) -> &[CertificateSection] {
        &self.certificates
    }

    /// The number of keys revoked explicitly or by fingerprint.
    pub fn revoked_key_count(&self) -> usize {
        self.revoked_keys.len() + self.revoked_sha1.len() + self.revoked_sha256.len()
    }

    pub fn signatures(&self) -> &[Signature] {
        &self.signatures
    }

    pub fn signing_keys(&self) -> impl Iterator<Item = &PublicKey> {
        self.signatures.iter().map(|signature| &signature.signing_key)
    }

    /// Whether the plain public key is revoked, either explicitly or by fingerprint.
    pub fn is_key_revoked(&self, key: &PublicKey) -> Result<bool, Error> {
        self.is_key_data_revoked(key.key_data())
    }

    /// Whether the certificate is revoked.
    ///
    /// The certificate is revoked if the CA that signed it is revoked as a plain key, if a
    /// certificate section for its CA (or for any CA) lists its key ID or serial number, or if
    /// the certified key itself is revoked. A serial number of zero means the CA didn't assign
    /// one and never matches a serial.
    pub fn is_certificate_revoked(&self, certificate: &Certificate) -> Result<bool, Error> {
        let ca_key = certificate.signature_key();
        if self.is_key_data_revoked(ca_key)? {
            return Ok(true);
        }

        let revoked = self
            .certificates
            .iter()
            .filter(|section| section.applies_to(ca_key))
            .any(|section| {
                section.revokes_key_id(certificate.key_id())
                    || section.revokes_serial(certificate.serial())
            });
        if revoked {
            return Ok(true);
        }

        self.is_key_data_revoked(certificate.public_key())
    }

    fn is_key_data_revoked(&self, key: &KeyData) -> Result<bool, Error> {
        let blob = PublicKey::from(key.clone())
            .to_bytes()
            .map_err(|source| Error::InvalidKey {
                what: "public key",
                source,
            })?;

        Ok(self.revoked_keys.contains(&blob)
            || self
                .revoked_sha1
                .contains(openssl::sha::sha1(&blob).as_slice())
            || self
                .revoked_sha256
                .contains(openssl::sha::sha256(&blob).as_slice()))
    }
}

impl CertificateSection {
    fn parse(section: &mut &[u8]) -> Result<Self, Error> {
        let ca_key = read_string(section, "certificate authority key")?;
        let ca_key = if ca_key.is_empty() {
            None
        } else {
            let key = PublicKey::from_bytes(ca_key).map_err(|source| Error::InvalidKey {
                what: "certificate authority key",
                source,
            })?;
            Some(key.key_data().clone())
        };
        let _reserved = read_string(section, "certificate section reserved field")?;

        let mut certificates = CertificateSection {
            ca_key,
            ..Default::default()
        };
        while section.has_remaining() {
            let subsection_type = read_u8(section, "certificate section type")?;
            let mut subsection = read_string(section, "certificate section")?;
            match subsection_type {
                CERT_SECTION_SERIAL_LIST => {
                    while subsection.has_remaining() {
                        certificates
                            .serials
                            .insert(read_u64(&mut subsection, "serial")?);
                    }
                }
                CERT_SECTION_SERIAL_RANGE => {
                    let min = read_u64(&mut subsection, "serial range")?;
                    let max = read_u64(&mut subsection, "serial range")?;
                    if min > max {
                        return Err(Error::InvalidSerialRange { min, max });
                    }
                    certificates.serial_ranges.push(min..=max);
                }
                CERT_SECTION_SERIAL_BITMAP => {
                    let offset = read_u64(&mut subsection, "serial bitmap offset")?;
                    let bitmap = read_string(&mut subsection, "serial bitmap")?;
                    if bitmap.first().is_some_and(|byte| byte & 0x80 != 0) {
                        return Err(Error::NegativeBitmap);
                    }
                    certificates.serial_bitmaps.push((offset, bitmap.to_vec()));
                }
                CERT_SECTION_KEY_ID => {
                    while subsection.has_remaining() {
                        let key_id = read_string(&mut subsection, "key id")?;
                        certificates.key_ids.insert(key_id.to_vec());
                    }
                }
                other => return Err(Error::UnknownCertificateSection(other)),
            }
            if subsection.has_remaining() {
                return Err(Error::TrailingData("certificate section"));
            }
        }

        Ok(certificates)
    }

    /// The CA this section applies to; `None` means any CA.
    pub fn ca_key(&self) -> Option<&KeyData> {
        self.ca_key.as_ref()
    }

    fn applies_to(&self, ca_key: &KeyData) -> bool {
        self.ca_key.as_ref().is_none_or(|key| key == ca_key)
    }

    fn revokes_key_id(&self, key_id: &str) -> bool {
        self.key_ids.contains(key_id.as_bytes())
    }

    fn revokes_serial(&self, serial: u64) -> bool {
        if serial == 0 {
            return false;
        }

        self.serials.contains(&serial)
            || self
                .serial_ranges
                .iter()
                .any(|range| range.contains(&serial))
            || self
                .serial_bitmaps
                .iter()
                .any(|(offset, bitmap)| bitmap_contains(*offset, bitmap, serial))
    }
}

fn bitmap_contains(offset: u64, bitmap: &[u8], serial: u64) -> bool {
    let Some(bit) = serial.checked_sub(offset) else {
        return false;
    };
    let Ok(byte_from_end) = usize::try_from(bit / 8) else {
        return false;
    };
    if byte_from_end >= bitmap.len() {
        return false;
    }
    bitmap[bitmap.len() - 1 - byte_from_end] & (1 << (bit % 8)) != 0
}

fn read_fingerprints(
    section: &mut &[u8],
    kind: &'static str,
    length: usize,
    into: &mut HashSet<Vec<u8>>,
) -> Result<(), Error> {
    while section.has_remaining() {
        let fingerprint = read_string(section, "fingerprint")?;
        if fingerprint.len() != length {
            return Err(Error::FingerprintLength {
                kind,
                length: fingerprint.len(),
            });
        }
        into.insert(fingerprint.to_vec());
    }
    Ok(())
}

fn read_u8(buf: &mut &[u8], what: &'static str) -> Result<u8, Error> {
    if buf.remaining() < 1 {
        return Err(Error::Truncated(what));
    }
    Ok(buf.get_u8())
}

fn read_u32(buf: &mut &[u8], what: &'static str) -> Result<u32, Error> {
    if buf.remaining() < 4 {
        return Err(Error::Truncated(what));
    }
    Ok(buf.get_u32())
}

fn read_u64(buf: &mut &[u8], what: &'static str) -> Result<u64, Error> {
    if buf.remaining() < 8 {
        return Err(Error::Truncated(what));
    }
    Ok(buf.get_u64())
}

fn read_string<'a>(buf: &mut &'a [u8], what: &'static str) -> Result<&'a [u8], Error> {
    let length = read_u32(buf, what)? as usize;
    if buf.len() < length {
        return Err(Error::Truncated(what));
    }
    let (string, rest) = buf.split_at(length);
    *buf = rest;
    Ok(string)
}

#[cfg(test)]
pub(crate) mod tests {
    use bytes::BufMut;
    use rand_core::OsRng;
    use ssh_key::{certificate, Algorithm, PrivateKey};

    use super::*;

    /// Assembles KRL binaries for tests.
    #[derive(Default)]
    pub(crate) struct KrlBuilder {
        sections: Vec<(u8, Vec<u8>)>,
        comment: String,
    }

    fn put_string(buf: &mut Vec<u8>, value: &[u8]) {
        buf.put_u32(value.len() as u32);
        buf.put_slice(value);
    }

    impl KrlBuilder {
        pub(crate) fn comment(mut self, comment: &str) -> Self {
            self.comment = comment.to_string();
            self
        }

        pub(crate) fn raw_section(mut self, section_type: u8, data: Vec<u8>) -> Self {
            self.sections.push((section_type, data));
            self
        }

        pub(crate) fn explicit_keys(self, keys: &[&PublicKey]) -> Self {
            let mut data = vec![];
            for key in keys {
                put_string(&mut data, &key.to_bytes().unwrap());
            }
            self.raw_section(SECTION_EXPLICIT_KEY, data)
        }

        pub(crate) fn sha256_fingerprints(self, keys: &[&PublicKey]) -> Self {
            let mut data = vec![];
            for key in keys {
                put_string(&mut data, &openssl::sha::sha256(&key.to_bytes().unwrap()));
            }
            self.raw_section(SECTION_FINGERPRINT_SHA256, data)
        }

        pub(crate) fn sha1_fingerprints(self, keys: &[&PublicKey]) -> Self {
            let mut data = vec![];
            for key in keys {
                put_string(&mut data, &openssl::sha::sha1(&key.to_bytes().unwrap()));
            }
            self.raw_section(SECTION_FINGERPRINT_SHA1, data)
        }

        /// A certificate section for `ca` with the given subsections.
        pub(crate) fn certificates(
            self,
            ca: Option<&PublicKey>,
            subsections: &[(u8, Vec<u8>)],
        ) -> Self {
            let mut data = vec![];
            put_string(
                &mut data,
                &ca.map(|key| key.to_bytes().unwrap()).unwrap_or_default(),
            );
            put_string(&mut data, &[]);
            for (subsection_type, subsection) in subsections {
                data.put_u8(*subsection_type);
                put_string(&mut data, subsection);
            }
            self.raw_section(SECTION_CERTIFICATES, data)
        }

        pub(crate) fn signature(self, signing_key: &PublicKey) -> Self {
            let mut data = vec![];
            put_string(&mut data, &signing_key.to_bytes().unwrap());
            put_string(&mut data, b"not really a signature");
            self.raw_section(SECTION_SIGNATURE, data)
        }

        pub(crate) fn build(self) -> Vec<u8> {
            let mut buf = vec![];
            buf.put_u64(MAGIC);
            buf.put_u32(FORMAT_VERSION);
            buf.put_u64(7);
            buf.put_u64(1_700_000_000);
            buf.put_u64(0);
            put_string(&mut buf, &[]);
            put_string(&mut buf, self.comment.as_bytes());
            for (section_type, data) in self.sections {
                buf.put_u8(section_type);
                put_string(&mut buf, &data);
            }
            buf
        }
    }

    fn serial_list(serials: &[u64]) -> (u8, Vec<u8>) {
        let mut data = vec![];
        for serial in serials {
            data.put_u64(*serial);
        }
        (CERT_SECTION_SERIAL_LIST, data)
    }

    fn serial_range(min: u64, max: u64) -> (u8, Vec<u8>) {
        let mut data = vec![];
        data.put_u64(min);
        data.put_u64(max);
        (CERT_SECTION_SERIAL_RANGE, data)
    }

    fn key_ids(ids: &[&str]) -> (u8, Vec<u8>) {
        let mut data = vec![];
        for id in ids {
            put_string(&mut data, id.as_bytes());
        }
        (CERT_SECTION_KEY_ID, data)
    }

    fn new_key() -> PrivateKey {
        PrivateKey::random(&mut OsRng, Algorithm::Ed25519).unwrap()
    }

    fn new_certificate(ca: &PrivateKey, serial: u64, key_id: &str) -> Certificate {
        let key = new_key();
        let mut builder = certificate::Builder::new_with_random_nonce(
            &mut OsRng,
            key.public_key().key_data().clone(),
            1_735_725_600,
            1_735_747_200,
        )
        .unwrap();
        builder.serial(serial).unwrap();
        builder.key_id(key_id).unwrap();
        builder.cert_type(certificate::CertType::User).unwrap();
        builder.valid_principal("foo").unwrap();
        builder.sign(ca).unwrap()
    }

    #[test]
    fn header_only() -> anyhow::Result<()> {
        let krl = KeyRevocationList::parse(&KrlBuilder::default().comment("hello").build())?;

        assert_eq!(krl.version(), 7);
        assert_eq!(krl.comment(), "hello");
        assert_eq!(krl.flags(), 0);
        assert_eq!(
            krl.generated_date(),
            DateTime::from_timestamp(1_700_000_000, 0)
        );
        assert_eq!(krl.revoked_key_count(), 0);
        assert!(!krl.is_key_revoked(new_key().public_key())?);

        Ok(())
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(
            KeyRevocationList::parse(b"abc"),
            Err(Error::Truncated("magic"))
        ));
        assert!(matches!(
            KeyRevocationList::parse(b"SSHKRL\n\x01\x00\x00\x00\x01"),
            Err(Error::BadMagic)
        ));
    }

    #[test]
    fn truncated_section_is_rejected() {
        let mut krl = KrlBuilder::default()
            .explicit_keys(&[new_key().public_key()])
            .build();
        krl.truncate(krl.len() - 3);

        assert!(matches!(
            KeyRevocationList::parse(&krl),
            Err(Error::Truncated("section"))
        ));
    }

    #[test]
    fn unknown_section_is_rejected() {
        let krl = KrlBuilder::default().raw_section(42, vec![]).build();

        assert!(matches!(
            KeyRevocationList::parse(&krl),
            Err(Error::UnknownSection(42))
        ));
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let mut krl = KrlBuilder::default().build();
        krl[11] = 2;

        assert!(matches!(
            KeyRevocationList::parse(&krl),
            Err(Error::UnsupportedFormatVersion(2))
        ));
    }

    #[test]
    fn explicit_keys() -> anyhow::Result<()> {
        let revoked = new_key();
        let fine = new_key();
        let krl = KrlBuilder::default()
            .explicit_keys(&[revoked.public_key()])
            .build();
        let krl = KeyRevocationList::parse(&krl)?;

        assert!(krl.is_key_revoked(revoked.public_key())?);
        assert!(!krl.is_key_revoked(fine.public_key())?);

        Ok(())
    }

    #[test]
    fn fingerprints() -> anyhow::Result<()> {
        let by_sha1 = new_key();
        let by_sha256 = new_key();
        let fine = new_key();
        let krl = KrlBuilder::default()
            .sha1_fingerprints(&[by_sha1.public_key()])
            .sha256_fingerprints(&[by_sha256.public_key()])
            .build();
        let krl = KeyRevocationList::parse(&krl)?;

        assert!(krl.is_key_revoked(by_sha1.public_key())?);
        assert!(krl.is_key_revoked(by_sha256.public_key())?);
        assert!(!krl.is_key_revoked(fine.public_key())?);
        assert_eq!(krl.revoked_key_count(), 2);

        Ok(())
    }

    #[test]
    fn bad_fingerprint_length() {
        let mut data = vec![];
        put_string(&mut data, &[0; 16]);
        let krl = KrlBuilder::default()
            .raw_section(SECTION_FINGERPRINT_SHA256, data)
            .build();

        assert!(matches!(
            KeyRevocationList::parse(&krl),
            Err(Error::FingerprintLength {
                kind: "sha256",
                length: 16
            })
        ));
    }

    #[test]
    fn certificates_by_serial_and_key_id() -> anyhow::Result<()> {
        let ca = new_key();
        let other_ca = new_key();
        let krl = KrlBuilder::default()
            .certificates(
                Some(ca.public_key()),
                &[
                    serial_list(&[3, 5]),
                    serial_range(100, 200),
                    key_ids(&["compromised"]),
                ],
            )
            .build();
        let krl = KeyRevocationList::parse(&krl)?;
        assert_eq!(krl.certificate_sections().len(), 1);
        assert_eq!(
            krl.certificate_sections()[0].ca_key(),
            Some(ca.public_key().key_data())
        );

        assert!(krl.is_certificate_revoked(&new_certificate(&ca, 5, "fine"))?);
        assert!(krl.is_certificate_revoked(&new_certificate(&ca, 150, "fine"))?);
        assert!(krl.is_certificate_revoked(&new_certificate(&ca, 1, "compromised"))?);
        assert!(!krl.is_certificate_revoked(&new_certificate(&ca, 4, "fine"))?);
        assert!(!krl.is_certificate_revoked(&new_certificate(&ca, 201, "fine"))?);
        assert!(!krl.is_certificate_revoked(&new_certificate(&other_ca, 5, "compromised"))?);

        Ok(())
    }

    #[test]
    fn any_ca_section() -> anyhow::Result<()> {
        let ca = new_key();
        let krl = KrlBuilder::default()
            .certificates(None, &[key_ids(&["compromised"])])
            .build();
        let krl = KeyRevocationList::parse(&krl)?;

        assert!(krl.is_certificate_revoked(&new_certificate(&ca, 1, "compromised"))?);
        assert!(!krl.is_certificate_revoked(&new_certificate(&ca, 1, "fine"))?);

        Ok(())
    }

    #[test]
    fn serial_bitmap() -> anyhow::Result<()> {
        let ca = new_key();
        let mut bitmap = vec![];
        bitmap.put_u64(1000);
        // Bits 0, 9 and 10 set: serials 1000, 1009, and 1010.
        put_string(&mut bitmap, &[0b0000_0110, 0b0000_0001]);
        let krl = KrlBuilder::default()
            .certificates(
                Some(ca.public_key()),
                &[(CERT_SECTION_SERIAL_BITMAP, bitmap)],
            )
            .build();
        let krl = KeyRevocationList::parse(&krl)?;

        for serial in [1000, 1009, 1010] {
            assert!(krl.is_certificate_revoked(&new_certificate(&ca, serial, "x"))?);
        }
        for serial in [999, 1001, 1008, 1011, 2000] {
            assert!(!krl.is_certificate_revoked(&new_certificate(&ca, serial, "x"))?);
        }

        Ok(())
    }

    #[test]
    fn zero_serial_never_matches() -> anyhow::Result<()> {
        let ca = new_key();
        let krl = KrlBuilder::default()
            .certificates(Some(ca.public_key()), &[serial_range(0, 10)])
            .build();
        let krl = KeyRevocationList::parse(&krl)?;

        assert!(!krl.is_certificate_revoked(&new_certificate(&ca, 0, "x"))?);
        assert!(krl.is_certificate_revoked(&new_certificate(&ca, 1, "x"))?);

        Ok(())
    }

    #[test]
    fn inverted_serial_range() {
        let ca = new_key();
        let krl = KrlBuilder::default()
            .certificates(Some(ca.public_key()), &[serial_range(10, 1)])
            .build();

        assert!(matches!(
            KeyRevocationList::parse(&krl),
            Err(Error::InvalidSerialRange { min: 10, max: 1 })
        ));
    }

    #[test]
    fn certified_key_revoked_explicitly() -> anyhow::Result<()> {
        let ca = new_key();
        let certificate = new_certificate(&ca, 9, "x");
        let certified_key = PublicKey::from(certificate.public_key().clone());
        let krl = KrlBuilder::default()
            .explicit_keys(&[&certified_key])
            .build();
        let krl = KeyRevocationList::parse(&krl)?;

        assert!(krl.is_certificate_revoked(&certificate)?);

        Ok(())
    }

    #[test]
    fn revoked_ca_revokes_its_certificates() -> anyhow::Result<()> {
        let ca = new_key();
        let other_ca = new_key();
        let krl = KrlBuilder::default()
            .explicit_keys(&[ca.public_key()])
            .build();
        let krl = KeyRevocationList::parse(&krl)?;

        assert!(krl.is_key_revoked(ca.public_key())?);
        assert!(krl.is_certificate_revoked(&new_certificate(&ca, 1, "x"))?);
        assert!(!krl.is_certificate_revoked(&new_certificate(&other_ca, 1, "x"))?);

        let krl = KrlBuilder::default()
            .sha256_fingerprints(&[ca.public_key()])
            .build();
        let krl = KeyRevocationList::parse(&krl)?;
        assert!(krl.is_certificate_revoked(&new_certificate(&ca, 2, "y"))?);

        Ok(())
    }

    #[test]
    fn signatures_come_last() -> anyhow::Result<()> {
        let signer = new_key();
        let krl = KrlBuilder::default()
            .explicit_keys(&[new_key().public_key()])
            .signature(signer.public_key())
            .build();
        let parsed = KeyRevocationList::parse(&krl)?;
        assert_eq!(
            parsed.signing_keys().collect::<Vec<_>>(),
            vec![signer.public_key()]
        );

        let krl = KrlBuilder::default()
            .signature(signer.public_key())
            .explicit_keys(&[new_key().public_key()])
            .build();
        assert!(matches!(
            KeyRevocationList::parse(&krl),
            Err(Error::SectionAfterSignature(SECTION_EXPLICIT_KEY))
        ));

        Ok(())
    }
}
