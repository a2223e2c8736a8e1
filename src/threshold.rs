//! Threshold sharing of viewing keys (Feldman VSS).
//!
//! A viewing-key scalar is split into `n` Shamir shares on a polynomial of
//! degree `t − 1`; commitments to the polynomial coefficients let any
//! holder verify their share without learning the secret. Any `t` valid
//! shares reconstruct the key by Lagrange interpolation at `x = 0`.
//!
//! Revocation is a policy-layer act (the wallet ledger marks a share
//! inactive); the cryptography cannot "un-share" a secret.

use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};

use crate::aead::{aead_open, aead_seal, KEY_LEN, NONCE_LEN};
use crate::curve::{Curve, Point, Scalar, SecretScalar};
use crate::error::{Error, Result};
use crate::types::ViewerPayload;

/// Domain tag for sealing share values to holders
const SHARE_AEAD_DOMAIN: &[u8] = b"SIP-SHARE-AEAD-v1";

/// Commitments `C_j = a_j·G` to the coefficients of the sharing polynomial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeldmanCommitments {
    points: Vec<Point>,
}

impl FeldmanCommitments {
    pub fn curve(&self) -> Curve {
        self.points[0].curve()
    }

    /// The reconstruction threshold (polynomial degree + 1).
    pub fn threshold(&self) -> usize {
        self.points.len()
    }

    /// The public key of the shared secret, `C_0 = secret·G`.
    pub fn secret_commitment(&self) -> &Point {
        &self.points[0]
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }
}

/// One Shamir point `(i, P(i))` on the sharing polynomial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Share {
    /// 1-indexed shareholder index
    pub index: u32,
    /// Polynomial evaluation `P(index)`
    pub value: Scalar,
}

/// A share sealed to a specific holder for distribution.
#[derive(Debug, Clone)]
pub struct IssuedShare {
    pub share_id: [u8; 16],
    pub holder_id: String,
    pub index: u32,
    pub sealed_value: ViewerPayload,
    pub commitments: FeldmanCommitments,
}

// ─── Dealing ──────────────────────────────────────────────────────────────────

/// Split `secret` into `total` shares with reconstruction threshold
/// `threshold`.
pub fn split<R: RngCore + CryptoRng>(
    secret: &Scalar,
    threshold: usize,
    total: usize,
    rng: &mut R,
) -> Result<(Vec<Share>, FeldmanCommitments)> {
    if threshold == 0 || total == 0 {
        return Err(Error::InvalidInput(
            "threshold and share count must be positive".into(),
        ));
    }
    if threshold > total {
        return Err(Error::InvalidInput(format!(
            "threshold {} exceeds share count {}",
            threshold, total
        )));
    }
    let curve = secret.curve();

    // P(0) = secret; remaining coefficients uniform
    let mut coefficients = Vec::with_capacity(threshold);
    coefficients.push(*secret);
    for _ in 1..threshold {
        coefficients.push(Scalar::random(curve, rng));
    }

    let commitments = FeldmanCommitments {
        points: coefficients
            .iter()
            .map(|a| curve.generator().mul(a))
            .collect::<Result<Vec<_>>>()?,
    };

    let mut shares = Vec::with_capacity(total);
    for index in 1..=total as u32 {
        shares.push(Share {
            index,
            value: evaluate(&coefficients, index)?,
        });
    }

    Ok((shares, commitments))
}

/// Horner evaluation of the polynomial at `x = index`.
fn evaluate(coefficients: &[Scalar], index: u32) -> Result<Scalar> {
    let curve = coefficients[0].curve();
    let x = Scalar::from_u64(curve, index as u64);
    let mut acc = Scalar::zero(curve);
    for coefficient in coefficients.iter().rev() {
        acc = acc.mul(&x)?.add(coefficient)?;
    }
    Ok(acc)
}

// ─── Verification ─────────────────────────────────────────────────────────────

/// Check a share against the dealer's Feldman commitments:
/// `P(i)·G = Σ_j i^j·C_j`.
pub fn verify_share(share: &Share, commitments: &FeldmanCommitments) -> Result<()> {
    if share.index == 0 {
        return Err(Error::InvalidShare("index must be >= 1".into()));
    }
    let curve = commitments.curve();
    if share.value.curve() != curve {
        return Err(Error::ChainMismatch("share value curve".into()));
    }

    let x = Scalar::from_u64(curve, share.index as u64);
    // Horner over points: Σ i^j·C_j
    let mut expected = Point::identity(curve);
    for commitment in commitments.points.iter().rev() {
        expected = expected.mul(&x)?.add(commitment)?;
    }

    let actual = curve.generator().mul(&share.value)?;
    if actual != expected {
        return Err(Error::InvalidShare(format!(
            "share {} does not lie on the committed polynomial",
            share.index
        )));
    }
    Ok(())
}

// ─── Reconstruction ───────────────────────────────────────────────────────────

/// Reconstruct the secret from at least `threshold` distinct shares by
/// Lagrange interpolation at `x = 0`.
pub fn reconstruct(shares: &[Share], threshold: usize) -> Result<Scalar> {
    if shares.len() < threshold {
        return Err(Error::BelowThreshold {
            have: shares.len(),
            need: threshold,
        });
    }
    let indices: Vec<u32> = shares.iter().map(|s| s.index).collect();
    let curve = shares[0].value.curve();
    let coefficients = lagrange_at_zero(curve, &indices)?;

    let mut secret = Scalar::zero(curve);
    for (share, lambda) in shares.iter().zip(coefficients.iter()) {
        secret = secret.add(&share.value.mul(lambda)?)?;
    }
    Ok(secret)
}

/// Lagrange coefficients for interpolation at `x = 0`.
///
/// `λ_i = Π_{j≠i} j / (j − i)`, computed with the common-denominator
/// technique so only one field inversion is needed:
/// `λ_i = ξ·ρ_i·d̄⁻¹` with `ξ = Π j`, `d_i = i·Π_{j≠i}(j − i)`,
/// `ρ_i = Π_{j≠i} d_j`, `d̄ = Π d_i`.
pub fn lagrange_at_zero(curve: Curve, indices: &[u32]) -> Result<Vec<Scalar>> {
    let k = indices.len();
    if k == 0 {
        return Err(Error::InvalidInput("no shares supplied".into()));
    }
    for &index in indices {
        if index == 0 {
            return Err(Error::InvalidShare("index must be >= 1".into()));
        }
    }
    let mut sorted = indices.to_vec();
    sorted.sort_unstable();
    for window in sorted.windows(2) {
        if window[0] == window[1] {
            return Err(Error::InvalidShare(format!(
                "duplicate share index {}",
                window[0]
            )));
        }
    }
    if k == 1 {
        return Ok(vec![Scalar::one(curve)]);
    }

    let xs: Vec<Scalar> = indices
        .iter()
        .map(|&i| Scalar::from_u64(curve, i as u64))
        .collect();

    let mut xi = Scalar::one(curve);
    for x in &xs {
        xi = xi.mul(x)?;
    }

    let mut d_values = Vec::with_capacity(k);
    for i in 0..k {
        let mut d = xs[i];
        for j in 0..k {
            if i != j {
                d = d.mul(&xs[j].sub(&xs[i])?)?;
            }
        }
        d_values.push(d);
    }

    // ρ_i via forward-backward pass
    let mut rho = vec![Scalar::one(curve); k];
    for i in 1..k {
        rho[i] = rho[i - 1].mul(&d_values[i - 1])?;
    }
    let mut suffix = Scalar::one(curve);
    for i in (0..k).rev() {
        rho[i] = rho[i].mul(&suffix)?;
        suffix = suffix.mul(&d_values[i])?;
    }

    let d_bar_inv = suffix.invert()?;
    let delta = xi.mul(&d_bar_inv)?;
    rho.iter().map(|rho_i| delta.mul(rho_i)).collect()
}

// ─── Issuance ─────────────────────────────────────────────────────────────────

/// Seal a share to a holder's public key for distribution.
pub fn issue_share<R: RngCore + CryptoRng>(
    share: &Share,
    commitments: &FeldmanCommitments,
    holder_id: &str,
    holder_pub: &Point,
    rng: &mut R,
) -> Result<IssuedShare> {
    let curve = commitments.curve();
    if holder_pub.curve() != curve {
        return Err(Error::ChainMismatch("holder key curve".into()));
    }

    let f = Scalar::random(curve, rng);
    let session_pub = curve.generator().mul(&f)?;
    let (key, nonce) = share_key_nonce(&holder_pub.mul(&f)?);

    let aad = share.index.to_be_bytes().to_vec();
    let ciphertext = aead_seal(&key, &nonce, &aad, &share.value.to_bytes())?;

    Ok(IssuedShare {
        share_id: crate::crypto::random_bytes::<16>(),
        holder_id: holder_id.to_string(),
        index: share.index,
        sealed_value: ViewerPayload {
            ephemeral_pub: session_pub.to_bytes(),
            ciphertext,
            aad,
        },
        commitments: commitments.clone(),
    })
}

/// Unseal an issued share with the holder's private key and verify it
/// against the dealer's commitments before accepting.
pub fn open_issued_share(issued: &IssuedShare, holder_secret: &SecretScalar) -> Result<Share> {
    let curve = issued.commitments.curve();
    let session_pub = Point::from_bytes(curve, &issued.sealed_value.ephemeral_pub)?;
    let (key, nonce) = share_key_nonce(&session_pub.mul(&holder_secret.to_scalar()?)?);

    let plaintext = aead_open(
        &key,
        &nonce,
        &issued.sealed_value.aad,
        &issued.sealed_value.ciphertext,
    )?;
    let value_bytes: [u8; 32] = plaintext
        .try_into()
        .map_err(|_| Error::InvalidShare("sealed value has wrong length".into()))?;

    let share = Share {
        index: issued.index,
        value: Scalar::from_bytes(curve, &value_bytes)?,
    };
    verify_share(&share, &issued.commitments)?;
    Ok(share)
}

fn share_key_nonce(ecdh: &Point) -> ([u8; KEY_LEN], [u8; NONCE_LEN]) {
    let mut hasher = Sha256::new();
    hasher.update(SHARE_AEAD_DOMAIN);
    hasher.update(ecdh.to_bytes());
    let key: [u8; 32] = hasher.finalize().into();

    let mut nonce_hasher = Sha256::new();
    nonce_hasher.update(SHARE_AEAD_DOMAIN);
    nonce_hasher.update(key);
    let nonce_full: [u8; 32] = nonce_hasher.finalize().into();
    let mut nonce = [0u8; NONCE_LEN];
    nonce.copy_from_slice(&nonce_full[..NONCE_LEN]);

    (key, nonce)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    fn random_secret(curve: Curve) -> Scalar {
        Scalar::random(curve, &mut OsRng)
    }

    #[test]
    fn test_split_verify_reconstruct() {
        for curve in [Curve::Secp256k1, Curve::Ed25519] {
            let secret = random_secret(curve);
            let (shares, commitments) = split(&secret, 3, 5, &mut OsRng).unwrap();
            assert_eq!(shares.len(), 5);
            assert_eq!(commitments.threshold(), 3);

            for share in &shares {
                verify_share(share, &commitments).unwrap();
            }

            let reconstructed = reconstruct(&shares[..3], 3).unwrap();
            assert_eq!(reconstructed, secret);

            // a different subset reconstructs the same secret
            let subset = vec![shares[0].clone(), shares[2].clone(), shares[4].clone()];
            assert_eq!(reconstruct(&subset, 3).unwrap(), secret);
        }
    }

    #[test]
    fn test_two_of_three() {
        let secret = random_secret(Curve::Ed25519);
        let (shares, commitments) = split(&secret, 2, 3, &mut OsRng).unwrap();

        for pair in [[0, 1], [0, 2], [1, 2]] {
            let subset = vec![shares[pair[0]].clone(), shares[pair[1]].clone()];
            assert_eq!(reconstruct(&subset, 2).unwrap(), secret);
        }

        assert!(matches!(
            reconstruct(&shares[..1], 2),
            Err(Error::BelowThreshold { have: 1, need: 2 })
        ));
        let _ = commitments;
    }

    #[test]
    fn test_tampered_share_fails_verification() {
        let secret = random_secret(Curve::Secp256k1);
        let (mut shares, commitments) = split(&secret, 2, 3, &mut OsRng).unwrap();

        shares[1].value = shares[1].value.add(&Scalar::one(Curve::Secp256k1)).unwrap();
        assert!(matches!(
            verify_share(&shares[1], &commitments),
            Err(Error::InvalidShare(_))
        ));
    }

    #[test]
    fn test_duplicate_index_rejected() {
        let secret = random_secret(Curve::Secp256k1);
        let (shares, _) = split(&secret, 2, 3, &mut OsRng).unwrap();
        let duplicated = vec![shares[0].clone(), shares[0].clone()];
        assert!(matches!(
            reconstruct(&duplicated, 2),
            Err(Error::InvalidShare(_))
        ));
    }

    #[test]
    fn test_secret_commitment_is_public_key() {
        let secret = random_secret(Curve::Ed25519);
        let (_, commitments) = split(&secret, 2, 3, &mut OsRng).unwrap();
        assert_eq!(
            *commitments.secret_commitment(),
            Curve::Ed25519.generator().mul(&secret).unwrap()
        );
    }

    #[test]
    fn test_issue_and_open_share() {
        let curve = Curve::Ed25519;
        let secret = random_secret(curve);
        let (shares, commitments) = split(&secret, 2, 3, &mut OsRng).unwrap();

        let holder = SecretScalar::random(curve, &mut OsRng);
        let holder_pub = holder.public_point().unwrap();

        let issued =
            issue_share(&shares[0], &commitments, "custodian-a", &holder_pub, &mut OsRng)
                .unwrap();
        let opened = open_issued_share(&issued, &holder).unwrap();
        assert_eq!(opened, shares[0]);

        // a different holder cannot open
        let outsider = SecretScalar::random(curve, &mut OsRng);
        assert!(open_issued_share(&issued, &outsider).is_err());
    }

    #[test]
    fn test_invalid_parameters() {
        let secret = random_secret(Curve::Secp256k1);
        assert!(split(&secret, 0, 3, &mut OsRng).is_err());
        assert!(split(&secret, 4, 3, &mut OsRng).is_err());
    }

    #[test]
    fn test_lagrange_partition_of_unity() {
        // Σ λ_i = 1 when interpolating any constant polynomial at zero
        let coefficients = lagrange_at_zero(Curve::Ed25519, &[1, 3, 7, 9]).unwrap();
        let mut sum = Scalar::zero(Curve::Ed25519);
        for c in &coefficients {
            sum = sum.add(c).unwrap();
        }
        assert_eq!(sum, Scalar::one(Curve::Ed25519));
    }
}
