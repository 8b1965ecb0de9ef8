//! End-to-end card lifecycle: issue, present, tamper.

use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

use idlock_core::{
    decrypt_signed_inner, detail, generate_encryption_key, generate_secret_signature_keypair,
    CardError, CertHolder, Context, FaceEngine,
};
use idlock_proto::{
    self as proto, CardBundle, Date, Identity, KeyKind, KeySet, Pair, PublicKeyEntry,
};

const PHOTO_MANNY: &[u8] = b"bitmap bytes: manny, enrollment portrait";
const PHOTO_BRAD: &[u8] = b"bitmap bytes: brad, someone else entirely";

fn make_keyset() -> KeySet {
    let enc = generate_encryption_key();
    let (public, skpk) = generate_secret_signature_keypair();
    KeySet {
        encryption_key: enc.to_vec(),
        signature_key: skpk.to_vec(),
        verification_keys: vec![PublicKeyEntry {
            kind: KeyKind::Ed25519Pub as i32,
            value: public.to_vec(),
        }],
    }
}

fn make_context() -> Context {
    let root = CertHolder::generate(&mut rand::rngs::OsRng);
    Context::new(make_keyset(), vec![root.value().clone()]).unwrap()
}

fn manny() -> Identity {
    Identity {
        surname: "Pacquiao".into(),
        given_name: "Manny".into(),
        place_of_birth: "Kibawe, Bukidnon".into(),
        pin: "12345".into(),
        date_of_birth: Some(Date {
            year: 1978,
            month: 12,
            day: 17,
        }),
        photo: PHOTO_MANNY.to_vec(),
        ..Default::default()
    }
}

#[test]
fn issue_then_verify_with_pin_and_face() {
    let ctx = make_context();
    let card = ctx.issue(&manny()).unwrap();

    let details = ctx.verify_card_with_pin(&card, "12345").unwrap();
    assert_eq!(details.surname, "Pacquiao");
    assert_eq!(details.given_name, "Manny");
    assert_eq!(
        details.date_of_birth,
        Some(Date {
            year: 1978,
            month: 12,
            day: 17
        })
    );

    assert!(ctx.verify_card_with_face(&card, PHOTO_MANNY).is_ok());
    assert!(matches!(
        ctx.verify_card_with_face(&card, PHOTO_BRAD),
        Err(CardError::NotAuthorized)
    ));
    assert!(matches!(
        ctx.verify_card_with_pin(&card, "54321"),
        Err(CardError::NotAuthorized)
    ));
}

#[test]
fn serialized_identity_entry_point() {
    let ctx = make_context();
    let card = ctx
        .create_card_with_face(&proto::encode(&manny()))
        .unwrap();
    assert!(ctx.verify_card_with_pin(&card, "12345").is_ok());
}

#[test]
fn public_region_follows_the_mask() {
    let ctx = make_context();
    let mut cmd = [0u8; 9];
    cmd[0] = idlock_core::ioctl::SET_ACL;
    cmd[1..9].copy_from_slice(&(detail::SURNAME | detail::PLACE_OF_BIRTH).to_le_bytes());
    ctx.ioctl(&mut cmd).unwrap();

    let card = ctx.issue(&manny()).unwrap();
    let bundle: CardBundle = proto::decode(&card).unwrap();
    let public = bundle.public_card.unwrap().details.unwrap();

    assert_eq!(public.surname, "Pacquiao");
    assert_eq!(public.place_of_birth, "Kibawe, Bukidnon");
    assert!(public.given_name.is_empty());
    assert!(public.date_of_birth.is_none());
    assert!(public.photo.is_empty());
}

#[test]
fn tampered_public_region_is_rejected() {
    let ctx = make_context();
    let mut cmd = [0u8; 9];
    cmd[0] = idlock_core::ioctl::SET_ACL;
    cmd[1..9].copy_from_slice(&(detail::SURNAME | detail::PLACE_OF_BIRTH).to_le_bytes());
    ctx.ioctl(&mut cmd).unwrap();

    let card = ctx.issue(&manny()).unwrap();
    let mut bundle: CardBundle = proto::decode(&card).unwrap();
    let public = bundle.public_card.as_mut().unwrap();
    public.details.as_mut().unwrap().place_of_birth = "Kibawe,Bukidnon".into();
    let tampered = proto::encode(&bundle);

    assert!(matches!(
        ctx.verify_card_with_face(&tampered, PHOTO_MANNY),
        Err(CardError::NotAuthorized)
    ));
    assert!(matches!(
        ctx.verify_card_with_pin(&tampered, "12345"),
        Err(CardError::NotAuthorized)
    ));
}

#[test]
fn any_corrupted_byte_fails_verification() {
    let ctx = make_context();
    let card = ctx.issue(&manny()).unwrap();
    for i in 0..card.len() {
        let mut mangled = card.clone();
        mangled[i] ^= 0x01;
        assert!(
            ctx.verify_card_with_pin(&mangled, "12345").is_err(),
            "flip at byte {i} went undetected"
        );
    }
}

#[test]
fn pin_only_card_never_matches_a_face() {
    let ctx = make_context();
    let mut ident = manny();
    ident.photo.clear();
    let card = ctx.issue(&ident).unwrap();

    assert!(ctx.verify_card_with_pin(&card, "12345").is_ok());
    assert!(matches!(
        ctx.verify_card_with_face(&card, PHOTO_MANNY),
        Err(CardError::NotAuthorized)
    ));
}

#[test]
fn identity_needs_a_photo_or_a_pin() {
    let ctx = make_context();
    let ident = Identity {
        surname: "Pacquiao".into(),
        ..Default::default()
    };
    assert!(matches!(
        ctx.issue(&ident),
        Err(CardError::InvalidInput(_))
    ));
}

struct NoFaceEngine;

impl FaceEngine for NoFaceEngine {
    fn describe(&self, _photo: &[u8]) -> Result<Vec<idlock_core::Descriptor>, CardError> {
        Ok(Vec::new())
    }
}

struct CrowdEngine;

impl FaceEngine for CrowdEngine {
    fn describe(&self, _photo: &[u8]) -> Result<Vec<idlock_core::Descriptor>, CardError> {
        Ok(vec![[0.1; 128], [0.9; 128]])
    }
}

#[test]
fn face_count_errors_are_distinct() {
    let ctx = make_context().with_engine(NoFaceEngine);
    let err = ctx.issue(&manny()).unwrap_err();
    assert!(matches!(err, CardError::FaceCount { found: 0 }));

    let ctx = make_context().with_engine(CrowdEngine);
    let err = ctx.issue(&manny()).unwrap_err();
    assert!(matches!(err, CardError::FaceCount { found: 2 }));
}

#[test]
fn extras_land_in_their_regions() {
    let ctx = make_context();
    let mut ident = manny();
    ident.pub_extra.push(Pair {
        key: "gender".into(),
        value: "male".into(),
    });
    ident.priv_extra.push(Pair {
        key: "color".into(),
        value: "blue".into(),
    });

    let card = ctx.issue(&ident).unwrap();
    let bundle: CardBundle = proto::decode(&card).unwrap();
    let public = bundle.public_card.unwrap().details.unwrap();
    assert_eq!(public.extra.len(), 1);
    assert_eq!(public.extra[0].key, "gender");

    let private = ctx.verify_card_with_pin(&card, "12345").unwrap();
    assert_eq!(private.extra.len(), 1);
    assert_eq!(private.extra[0].key, "color");
}

#[test]
fn well_known_supplementary_fields_roundtrip() {
    let ctx = make_context();
    let mut ident = manny();
    ident.full_name = "Manny Pacquiao".into();
    ident.uin = "314159".into();
    ident.gender = 2;
    ident.postal_address = Some(idlock_proto::PostalAddress {
        language_code: "en".into(),
        organization: "NEWLOGIC".into(),
        ..Default::default()
    });

    let card = ctx.issue(&ident).unwrap();
    let details = ctx.verify_card_with_face(&card, PHOTO_MANNY).unwrap();
    assert_eq!(details.full_name, "Manny Pacquiao");
    assert_eq!(details.uin, "314159");
    assert_eq!(details.gender, 2);
    let addr = details.postal_address.unwrap();
    assert_eq!(addr.language_code, "en");
    assert_eq!(addr.organization, "NEWLOGIC");
}

#[test]
fn verify_with_precomputed_template() {
    let ctx = make_context();
    let card = ctx.issue(&manny()).unwrap();

    // Default precision is half; a full-precision input is demoted to match.
    let full = ctx.face_template_full(PHOTO_MANNY).unwrap();
    assert!(ctx.verify_card_with_template(&card, &full).is_ok());

    let half = ctx.face_template_half(PHOTO_MANNY).unwrap();
    assert!(ctx.verify_card_with_template(&card, &half).is_ok());

    let impostor = ctx.face_template_full(PHOTO_BRAD).unwrap();
    assert!(matches!(
        ctx.verify_card_with_template(&card, &impostor),
        Err(CardError::NotAuthorized)
    ));

    assert!(matches!(
        ctx.verify_card_with_template(&card, &[0u8; 77]),
        Err(CardError::InvalidInput(_))
    ));
}

#[test]
fn half_template_cannot_open_a_full_card() {
    let ctx = make_context();
    ctx.ioctl(&mut [idlock_core::ioctl::SET_FDIM, 1]).unwrap();
    let card = ctx.issue(&manny()).unwrap();

    let full = ctx.face_template_full(PHOTO_MANNY).unwrap();
    assert!(ctx.verify_card_with_template(&card, &full).is_ok());

    let half = ctx.face_template_half(PHOTO_MANNY).unwrap();
    assert!(matches!(
        ctx.verify_card_with_template(&card, &half),
        Err(CardError::InvalidInput(_))
    ));
}

#[test]
fn sign_and_verify_with_card() {
    let keyset = make_keyset();
    let enc_key = keyset.encryption_key.clone();
    let ctx = Context::new(keyset, Vec::new()).unwrap();
    let card = ctx.issue(&manny()).unwrap();

    let msg = b"attack at dawn!";
    let signature = ctx.sign_with_card(&card, msg).unwrap();

    // Fish the card's public key out of the private region, the way a
    // relying party holding the symmetric key would.
    let bundle: CardBundle = proto::decode(&card).unwrap();
    let signed = decrypt_signed_inner(&bundle.encrypted_card, &enc_key).unwrap();
    let skpk = signed.card.unwrap().signing_key;
    let card_public = &skpk[32..];

    assert!(ctx.verify_with_card(msg, &signature, card_public).is_ok());
    assert!(ctx
        .verify_with_card(b"attack at dusk!", &signature, card_public)
        .is_err());
}

#[test]
fn card_box_roundtrip() {
    let ctx = make_context();
    let card = ctx.issue(&manny()).unwrap();

    let msg = b"attack at dawn!";
    let sealed = ctx.encrypt_with_card(&card, msg).unwrap();
    assert!(sealed.len() > 24 + msg.len());

    let opened = ctx.decrypt_with_card(&card, &sealed).unwrap();
    assert_eq!(&opened[..], msg);

    let mut mangled = sealed.clone();
    let last = mangled.len() - 1;
    mangled[last] ^= 0x01;
    assert!(matches!(
        ctx.decrypt_with_card(&card, &mangled),
        Err(CardError::NotAuthorized)
    ));
}

fn fixed_clock() -> i64 {
    1_600_000_000
}

#[test]
fn issuance_is_deterministic_under_fixed_randomness() {
    let keyset = make_keyset();
    let card_a = Context::new(keyset.clone(), Vec::new())
        .unwrap()
        .with_rng(ChaCha20Rng::seed_from_u64(42))
        .with_clock(fixed_clock)
        .issue(&manny())
        .unwrap();
    let card_b = Context::new(keyset, Vec::new())
        .unwrap()
        .with_rng(ChaCha20Rng::seed_from_u64(42))
        .with_clock(fixed_clock)
        .issue(&manny())
        .unwrap();
    assert_eq!(card_a, card_b);
}

#[test]
fn card_signatures_are_invariant() {
    let ctx = make_context();
    let card = ctx.issue(&manny()).unwrap();
    let msg = b"the same message, a thousand times";
    let first = ctx.sign_with_card(&card, msg).unwrap();
    for _ in 0..999 {
        assert_eq!(ctx.sign_with_card(&card, msg).unwrap(), first);
    }
}

#[test]
fn issued_card_fits_a_qr_code() {
    let ctx = make_context();
    let card = ctx.issue(&manny()).unwrap();
    let matrix = ctx.qr_bits(&card).unwrap();
    assert!(matrix.side >= 21);
}

#[test]
fn verification_is_safe_under_concurrency() {
    use std::sync::Arc;

    let ctx = Arc::new(make_context());
    let card = Arc::new(ctx.issue(&manny()).unwrap());

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let ctx = Arc::clone(&ctx);
            let card = Arc::clone(&card);
            std::thread::spawn(move || {
                for _ in 0..16 {
                    let details = ctx.verify_card_with_pin(&card, "12345").unwrap();
                    assert_eq!(details.surname, "Pacquiao");
                    assert!(ctx.verify_card_with_face(&card, PHOTO_MANNY).is_ok());
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
}
