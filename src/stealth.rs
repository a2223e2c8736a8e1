//! Stealth addresses for the SIP core.
//!
//! EIP-5564 style derivation on secp256k1 for the Ethereum family, with
//! the analogous construction on edwards25519 for Solana and NEAR.
//!
//! # Protocol
//!
//! 1. Recipient publishes a long-lived meta-address (spending + viewing
//!    public keys)
//! 2. Sender derives a one-time address from the meta-address and a fresh
//!    ephemeral key, publishing only the ephemeral public key and a
//!    one-byte view tag
//! 3. Recipient scans announcements with the viewing key; the view tag
//!    discards ~255/256 of candidates before any point multiplication
//! 4. Only the recipient can derive the private key that spends from the
//!    one-time address

use rand::{CryptoRng, RngCore};
use subtle::ConstantTimeEq;

use crate::crypto::keccak256;
use crate::curve::{hash_to_scalar, Point, Scalar, SecretScalar};
use crate::error::{Error, Result};
use crate::types::ChainTag;

/// Domain separation tag for the ECDH shared-secret hash
pub const STEALTH_DOMAIN: &str = "SIP-STEALTH-v1";

/// Domain separation tag for view-tag derivation
pub const VIEW_TAG_DOMAIN: &str = "SIP-VIEWTAG-v1";

/// Domain tags for deterministic wallet key derivation from a master secret
const MASTER_SPEND_DOMAIN: &str = "SIP-STEALTH-SPEND-v1";
const MASTER_VIEW_DOMAIN: &str = "SIP-STEALTH-VIEW-v1";

// ─── Meta-address ─────────────────────────────────────────────────────────────

/// A recipient's long-lived stealth meta-address.
///
/// Canonical string form: `sip:<chain>:<0xhex spending>:<0xhex viewing>`
/// with compressed, lowercase-hex public keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StealthMetaAddress {
    chain: ChainTag,
    spending_pub: Point,
    viewing_pub: Point,
}

impl StealthMetaAddress {
    pub fn new(chain: ChainTag, spending_pub: Point, viewing_pub: Point) -> Result<Self> {
        if spending_pub.curve() != chain.curve() || viewing_pub.curve() != chain.curve() {
            return Err(Error::ChainMismatch(format!(
                "meta-address keys must be on {}",
                chain.curve()
            )));
        }
        Ok(Self {
            chain,
            spending_pub,
            viewing_pub,
        })
    }

    pub fn chain(&self) -> ChainTag {
        self.chain
    }

    pub fn spending_pub(&self) -> &Point {
        &self.spending_pub
    }

    pub fn viewing_pub(&self) -> &Point {
        &self.viewing_pub
    }

    /// Encode to the `sip:` URI form.
    pub fn encode(&self) -> String {
        format!(
            "sip:{}:0x{}:0x{}",
            self.chain,
            hex::encode(self.spending_pub.to_bytes()),
            hex::encode(self.viewing_pub.to_bytes())
        )
    }

    /// Decode the `sip:` URI form.
    ///
    /// Rejects unknown chain tags, wrong-length keys, and non-canonical
    /// point encodings.
    pub fn decode(encoded: &str) -> Result<Self> {
        let parts: Vec<&str> = encoded.split(':').collect();
        if parts.len() != 4 || parts[0] != "sip" {
            return Err(Error::InvalidMetaAddress(format!(
                "expected sip:<chain>:<spend>:<view>, got {}",
                encoded
            )));
        }

        let chain: ChainTag = parts[1].parse()?;
        let spending_bytes = crate::crypto::hex_to_bytes(parts[2])?;
        let viewing_bytes = crate::crypto::hex_to_bytes(parts[3])?;

        let spending_pub = Point::from_bytes(chain.curve(), &spending_bytes)?;
        let viewing_pub = Point::from_bytes(chain.curve(), &viewing_bytes)?;
        Self::new(chain, spending_pub, viewing_pub)
    }
}

// ─── Wallet keys ──────────────────────────────────────────────────────────────

/// The private half of a stealth meta-address.
pub struct StealthKeys {
    chain: ChainTag,
    spending: SecretScalar,
    viewing: SecretScalar,
}

impl StealthKeys {
    /// Generate fresh random wallet keys.
    pub fn generate<R: RngCore + CryptoRng>(chain: ChainTag, rng: &mut R) -> Self {
        Self {
            chain,
            spending: SecretScalar::random(chain.curve(), rng),
            viewing: SecretScalar::random(chain.curve(), rng),
        }
    }

    /// Derive wallet keys deterministically from a 32-byte master secret.
    pub fn from_master_secret(chain: ChainTag, master_secret: &[u8; 32]) -> Self {
        let curve = chain.curve();
        let spending = hash_to_scalar(MASTER_SPEND_DOMAIN, master_secret, curve);
        let viewing = hash_to_scalar(MASTER_VIEW_DOMAIN, master_secret, curve);
        Self {
            chain,
            spending: SecretScalar::from_scalar(&spending),
            viewing: SecretScalar::from_scalar(&viewing),
        }
    }

    pub fn chain(&self) -> ChainTag {
        self.chain
    }

    pub fn viewing(&self) -> &SecretScalar {
        &self.viewing
    }

    pub fn spending(&self) -> &SecretScalar {
        &self.spending
    }

    /// The publishable meta-address.
    pub fn meta_address(&self) -> Result<StealthMetaAddress> {
        StealthMetaAddress::new(
            self.chain,
            self.spending.public_point()?,
            self.viewing.public_point()?,
        )
    }
}

// ─── One-time addresses ───────────────────────────────────────────────────────

/// A derived one-time stealth address, published alongside a payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StealthAddress {
    chain: ChainTag,
    /// Chain-native address bytes (20 for Ethereum, 32 for ed25519 chains)
    address: Vec<u8>,
    ephemeral_pub: Point,
    view_tag: u8,
}

impl StealthAddress {
    pub fn chain(&self) -> ChainTag {
        self.chain
    }

    pub fn address_bytes(&self) -> &[u8] {
        &self.address
    }

    pub fn ephemeral_pub(&self) -> &Point {
        &self.ephemeral_pub
    }

    pub fn view_tag(&self) -> u8 {
        self.view_tag
    }

    /// Chain-native display form: EIP-55 checksummed hex on Ethereum,
    /// base58 on ed25519 chains.
    pub fn address_string(&self) -> String {
        match self.chain.curve() {
            crate::curve::Curve::Secp256k1 => checksum_address(&self.address),
            crate::curve::Curve::Ed25519 => bs58::encode(&self.address).into_string(),
        }
    }
}

/// Derive a one-time stealth address from a meta-address and an explicit
/// ephemeral private key.
///
/// # Protocol
///
/// 1. `s = hash_to_scalar("SIP-STEALTH-v1", e·viewing_pub)`
/// 2. `P = spending_pub + s·G`
/// 3. address = chain-native rendering of `P`
/// 4. view tag = first byte of `hash_to_scalar("SIP-VIEWTAG-v1", s)`
///
/// The ephemeral secret is consumed; its bytes are zeroized when the
/// holder drops at the end of this call.
pub fn derive_stealth_address(
    meta: &StealthMetaAddress,
    ephemeral: SecretScalar,
) -> Result<StealthAddress> {
    let curve = meta.chain.curve();
    if ephemeral.curve() != curve {
        return Err(Error::ChainMismatch("ephemeral key curve".into()));
    }

    let e = ephemeral.to_scalar()?;
    let ephemeral_pub = curve.generator().mul(&e)?;

    let ecdh = meta.viewing_pub.mul(&e)?;
    let s = shared_secret_scalar(&ecdh);

    let one_time_pub = meta.spending_pub.add(&curve.generator().mul(&s)?)?;
    if one_time_pub.is_identity() {
        return Err(Error::DegenerateKey(
            "one-time public key is the identity".into(),
        ));
    }

    Ok(StealthAddress {
        chain: meta.chain,
        address: chain_native_address(meta.chain, &one_time_pub)?,
        ephemeral_pub,
        view_tag: view_tag(&s),
    })
}

/// Derive a one-time stealth address under a fresh ephemeral key.
pub fn generate_stealth_address<R: RngCore + CryptoRng>(
    meta: &StealthMetaAddress,
    rng: &mut R,
) -> Result<StealthAddress> {
    let ephemeral = SecretScalar::random(meta.chain.curve(), rng);
    derive_stealth_address(meta, ephemeral)
}

// ─── Recipient side ───────────────────────────────────────────────────────────

/// An on-chain stealth announcement a recipient scans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StealthAnnouncement {
    pub ephemeral_pub: Point,
    pub view_tag: u8,
    pub address: Vec<u8>,
}

impl From<&StealthAddress> for StealthAnnouncement {
    fn from(addr: &StealthAddress) -> Self {
        Self {
            ephemeral_pub: addr.ephemeral_pub,
            view_tag: addr.view_tag,
            address: addr.address.clone(),
        }
    }
}

/// Recipient-side scanner over stealth announcements.
///
/// Holds only the viewing secret and the spending *public* key, so it is
/// safe to run in view-only deployments. Candidate sets can be partitioned
/// across workers; each `matches` call is independent.
pub struct StealthScanner {
    chain: ChainTag,
    viewing: SecretScalar,
    spending_pub: Point,
}

impl StealthScanner {
    pub fn new(keys: &StealthKeys) -> Result<Self> {
        Ok(Self {
            chain: keys.chain,
            viewing: SecretScalar::from_scalar(&keys.viewing.to_scalar()?),
            spending_pub: keys.spending.public_point()?,
        })
    }

    /// View-only construction from the viewing secret and spending public
    /// key alone.
    pub fn view_only(chain: ChainTag, viewing: SecretScalar, spending_pub: Point) -> Result<Self> {
        if viewing.curve() != chain.curve() || spending_pub.curve() != chain.curve() {
            return Err(Error::ChainMismatch("scanner key curve".into()));
        }
        Ok(Self {
            chain,
            viewing,
            spending_pub,
        })
    }

    /// Does this announcement pay us?
    ///
    /// The view tag rejects ~255/256 of foreign announcements before the
    /// full address recomputation resolves the rest.
    pub fn matches(&self, announcement: &StealthAnnouncement) -> Result<bool> {
        let v = self.viewing.to_scalar()?;
        let ecdh = announcement.ephemeral_pub.mul(&v)?;
        let s = shared_secret_scalar(&ecdh);

        if view_tag(&s) != announcement.view_tag {
            return Ok(false);
        }

        let curve = self.chain.curve();
        let expected_pub = self.spending_pub.add(&curve.generator().mul(&s)?)?;
        if expected_pub.is_identity() {
            return Err(Error::DegenerateKey(
                "one-time public key is the identity".into(),
            ));
        }
        let expected = chain_native_address(self.chain, &expected_pub)?;

        Ok(expected.ct_eq(&announcement.address).into())
    }

    /// Scan a batch, returning the indices that pay us.
    pub fn scan(&self, announcements: &[StealthAnnouncement]) -> Result<Vec<usize>> {
        let mut matched = Vec::new();
        for (index, announcement) in announcements.iter().enumerate() {
            if self.matches(announcement)? {
                matched.push(index);
            }
        }
        Ok(matched)
    }
}

/// Derive the private key that spends from a stealth address.
///
/// `k_stealth = (k_spend + s') mod order`, where `s'` is the recipient-side
/// recomputation of the shared secret.
pub fn derive_stealth_spending_key(
    keys: &StealthKeys,
    ephemeral_pub: &Point,
) -> Result<SecretScalar> {
    if ephemeral_pub.curve() != keys.chain.curve() {
        return Err(Error::ChainMismatch("ephemeral key curve".into()));
    }
    let v = keys.viewing.to_scalar()?;
    let ecdh = ephemeral_pub.mul(&v)?;
    let s = shared_secret_scalar(&ecdh);

    let k_stealth = keys.spending.to_scalar()?.add(&s)?;
    Ok(SecretScalar::from_scalar(&k_stealth))
}

// ─── Derivation internals ─────────────────────────────────────────────────────

fn shared_secret_scalar(ecdh_point: &Point) -> Scalar {
    hash_to_scalar(STEALTH_DOMAIN, &ecdh_point.to_bytes(), ecdh_point.curve())
}

fn view_tag(shared_secret: &Scalar) -> u8 {
    hash_to_scalar(
        VIEW_TAG_DOMAIN,
        &shared_secret.to_bytes(),
        shared_secret.curve(),
    )
    .to_bytes()[0]
}

/// Render a one-time public key as chain-native address bytes.
pub fn chain_native_address(chain: ChainTag, one_time_pub: &Point) -> Result<Vec<u8>> {
    match chain.curve() {
        crate::curve::Curve::Secp256k1 => Ok(eth_address(one_time_pub)?.to_vec()),
        crate::curve::Curve::Ed25519 => Ok(one_time_pub.to_bytes()),
    }
}

/// Ethereum address: last 20 bytes of Keccak-256 over the uncompressed
/// public key without its SEC1 prefix.
pub fn eth_address(public_key: &Point) -> Result<[u8; 20]> {
    let uncompressed = public_key.to_uncompressed_sec1()?;
    let hash = keccak256(&uncompressed[1..]);
    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    Ok(address)
}

/// EIP-55 checksummed rendering of an Ethereum address.
pub fn checksum_address(address: &[u8]) -> String {
    let address_hex = hex::encode(address);
    let checksum_hash = keccak256(address_hex.as_bytes());

    let mut checksummed = String::with_capacity(2 + address_hex.len());
    checksummed.push_str("0x");
    for (i, c) in address_hex.chars().enumerate() {
        if c.is_ascii_digit() {
            checksummed.push(c);
        } else {
            let nibble = (checksum_hash[i / 2] >> (4 * (1 - (i % 2)))) & 0x0f;
            if nibble >= 8 {
                checksummed.push(c.to_ascii_uppercase());
            } else {
                checksummed.push(c.to_ascii_lowercase());
            }
        }
    }
    checksummed
}
