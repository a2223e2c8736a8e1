//! End-to-end protocol scenarios.
//!
//! Each test walks one of the seed scenarios the protocol is specified
//! against, using only the public crate surface.

use hex_literal::hex;
use rand::rngs::OsRng;

use sip_core::commitment::{bind_to_asset, blinding_add, commit, commit_random};
use sip_core::curve::{Curve, Point, Scalar};
use sip_core::proof::{
    derive_nullifier, FundingProof, FundingPublic, FundingWitness, IntentSignature,
    ValidityProof, ValidityPublic, ValidityWitness,
};
use sip_core::stealth::{
    chain_native_address, derive_stealth_address, derive_stealth_spending_key, eth_address,
    StealthKeys, StealthScanner,
};
use sip_core::threshold::{reconstruct, split, verify_share};
use sip_core::types::ChainTag;
use sip_core::{Error, NullifierSet, SecretScalar};

use k256::ecdsa::signature::hazmat::PrehashSigner;

/// S1 — stealth round-trip on Ethereum with fixed key material.
#[test]
fn s1_stealth_roundtrip_ethereum() {
    let master_secret = hex!("0101010101010101010101010101010101010101010101010101010101010101");
    let ephemeral_bytes =
        hex!("0202020202020202020202020202020202020202020202020202020202020202");

    let keys = StealthKeys::from_master_secret(ChainTag::Ethereum, &master_secret);
    let meta = keys.meta_address().unwrap();

    // the meta-address survives its wire form
    let decoded = sip_core::StealthMetaAddress::decode(&meta.encode()).unwrap();
    assert_eq!(decoded, meta);

    let ephemeral =
        SecretScalar::from_scalar(&Scalar::from_bytes(Curve::Secp256k1, &ephemeral_bytes).unwrap());
    let stealth = derive_stealth_address(&meta, ephemeral).unwrap();
    assert_eq!(stealth.address_bytes().len(), 20);

    // recipient scan finds the payment
    let scanner = StealthScanner::new(&keys).unwrap();
    assert!(scanner.matches(&(&stealth).into()).unwrap());

    // the derived spending key controls the one-time address
    let spending_key = derive_stealth_spending_key(&keys, stealth.ephemeral_pub()).unwrap();
    let controlled = eth_address(&spending_key.public_point().unwrap()).unwrap();
    assert_eq!(controlled.as_slice(), stealth.address_bytes());

    // determinism: the same ephemeral key re-derives the same address
    let ephemeral_again =
        SecretScalar::from_scalar(&Scalar::from_bytes(Curve::Secp256k1, &ephemeral_bytes).unwrap());
    let again = derive_stealth_address(&meta, ephemeral_again).unwrap();
    assert_eq!(again.address_bytes(), stealth.address_bytes());
    assert_eq!(again.view_tag(), stealth.view_tag());
}

/// S1 analogue on the edwards25519 side.
#[test]
fn s1_stealth_roundtrip_solana() {
    let keys = StealthKeys::from_master_secret(ChainTag::Solana, &[0x01; 32]);
    let meta = keys.meta_address().unwrap();

    let stealth = sip_core::generate_stealth_address(&meta, &mut OsRng).unwrap();
    let scanner = StealthScanner::new(&keys).unwrap();
    assert!(scanner.matches(&(&stealth).into()).unwrap());

    let spending_key = derive_stealth_spending_key(&keys, stealth.ephemeral_pub()).unwrap();
    assert_eq!(
        chain_native_address(ChainTag::Solana, &spending_key.public_point().unwrap()).unwrap(),
        stealth.address_bytes()
    );
}

/// S2 — amount homomorphism, byte-for-byte.
#[test]
fn s2_amount_homomorphism() {
    for curve in [Curve::Secp256k1, Curve::Ed25519] {
        let (c1, r1) = commit_random(curve, 100, &mut OsRng).unwrap();
        let (c2, r2) = commit_random(curve, 250, &mut OsRng).unwrap();

        let sum = c1.add(&c2).unwrap();
        let direct = commit(curve, 350, &blinding_add(&r1, &r2).unwrap()).unwrap();
        assert_eq!(sum.to_bytes(), direct.to_bytes());
    }
}

fn validity_fixture(
    timestamp: u64,
    expiry: u64,
) -> (ValidityPublic, ValidityWitness) {
    let curve = Curve::Secp256k1;
    let intent_hash = [0x33; 32];
    let nonce = [0x44; 32];

    let signing_key = k256::ecdsa::SigningKey::random(&mut OsRng);
    let sender_pubkey = Point::from_bytes(
        curve,
        signing_key.verifying_key().to_sec1_bytes().as_ref(),
    )
    .unwrap();
    let sender_address = eth_address(&sender_pubkey).unwrap().to_vec();

    let sig: k256::ecdsa::Signature = signing_key.sign_prehash(&intent_hash).unwrap();
    let sig = sig.normalize_s().unwrap_or(sig);

    let sender_blinding = Scalar::random(curve, &mut OsRng);
    let sender_secret = Scalar::random(curve, &mut OsRng);

    let commitment_point = curve
        .generator()
        .mul(&sip_core::proof::address_scalar(curve, &sender_address))
        .unwrap()
        .add(&curve.pedersen_h().mul(&sender_blinding).unwrap())
        .unwrap();

    (
        ValidityPublic {
            curve,
            intent_hash,
            sender_commitment: sip_core::Commitment::from_bytes(
                curve,
                &commitment_point.to_bytes(),
            )
            .unwrap(),
            nullifier: derive_nullifier(&sender_secret, &intent_hash, &nonce),
            timestamp,
            expiry,
        },
        ValidityWitness {
            sender_address,
            sender_blinding,
            sender_secret,
            sender_pubkey,
            signature: IntentSignature::Ecdsa(sig),
            nonce,
        },
    )
}

/// S3 — double-spend detection across two otherwise-valid proofs.
#[test]
fn s3_double_spend_detection() {
    let (public, witness) = validity_fixture(999, 2_000);

    // the same (secret, intent_hash, nonce) admits two independent proofs
    let proof_a = ValidityProof::prove(&public, &witness, &mut OsRng).unwrap();
    let proof_b = ValidityProof::prove(&public, &witness, &mut OsRng).unwrap();
    assert!(proof_a.verify(&public).is_valid());
    assert!(proof_b.verify(&public).is_valid());

    // but the nullifier spends exactly once
    let spent = NullifierSet::new();
    spent.check_and_insert(public.nullifier).unwrap();
    assert!(matches!(
        spent.check_and_insert(public.nullifier),
        Err(Error::NullifierReuse)
    ));
}

/// S4 — signature malleability rejected at proof generation.
#[test]
fn s4_high_s_signature_rejected() {
    let (public, mut witness) = validity_fixture(999, 2_000);

    let sig = match &witness.signature {
        IntentSignature::Ecdsa(sig) => *sig,
        _ => unreachable!(),
    };
    let high_s =
        k256::ecdsa::Signature::from_scalars(sig.r().to_bytes(), (-*sig.s()).to_bytes())
            .unwrap();
    witness.signature = IntentSignature::Ecdsa(high_s);

    assert!(matches!(
        ValidityProof::prove(&public, &witness, &mut OsRng),
        Err(Error::SignatureMalleable)
    ));
}

/// S5 — expiry comparison is strict.
#[test]
fn s5_expiry_is_strict() {
    // timestamp == expiry refuses
    let (public, witness) = validity_fixture(1_000, 1_000);
    assert!(matches!(
        ValidityProof::prove(&public, &witness, &mut OsRng),
        Err(Error::IntentExpired(_))
    ));

    // one second earlier passes
    let (public, witness) = validity_fixture(999, 1_000);
    let proof = ValidityProof::prove(&public, &witness, &mut OsRng).unwrap();
    assert!(proof.verify(&public).is_valid());
}

/// S6 — 2-of-3 threshold disclosure of a viewing secret.
#[test]
fn s6_threshold_disclosure() {
    let curve = Curve::Ed25519;
    let viewing_secret = Scalar::random(curve, &mut OsRng);
    let (shares, commitments) = split(&viewing_secret, 2, 3, &mut OsRng).unwrap();

    // any two of three reconstruct
    for pair in [[0usize, 1], [0, 2], [1, 2]] {
        let subset = vec![shares[pair[0]].clone(), shares[pair[1]].clone()];
        assert_eq!(reconstruct(&subset, 2).unwrap(), viewing_secret);
    }

    // one share does not
    assert!(matches!(
        reconstruct(&shares[..1], 2),
        Err(Error::BelowThreshold { have: 1, need: 2 })
    ));

    // a corrupted share fails Feldman verification before any
    // reconstruction is attempted
    let mut corrupted = shares[0].clone();
    corrupted.value = corrupted.value.add(&Scalar::one(curve)).unwrap();
    assert!(matches!(
        verify_share(&corrupted, &commitments),
        Err(Error::InvalidShare(_))
    ));
}

/// A funding proof only binds to the asset it was issued for.
#[test]
fn funding_proof_asset_binding() {
    let curve = Curve::Secp256k1;
    let (commitment, blinding) = commit_random(curve, 50_000, &mut OsRng).unwrap();
    let asset = [0x99; 32];

    let public = FundingPublic {
        curve,
        commitment_hash: bind_to_asset(&commitment, &asset),
        minimum_required: 10_000,
        asset_id: asset,
    };
    let proof = FundingProof::prove(
        &public,
        &FundingWitness {
            balance: 50_000,
            blinding,
        },
        &mut OsRng,
    )
    .unwrap();
    assert!(proof.verify(&public).is_valid());

    let mut other_asset = public.clone();
    other_asset.asset_id = [0x77; 32];
    assert!(!proof.verify(&other_asset).is_valid());
}
