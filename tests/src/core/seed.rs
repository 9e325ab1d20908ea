use braid_core::result::Error;
use braid_core::seed::Seed;
use rand::{Rng, RngCore};

const FIXED: &str = "0x00112233445566778899aabbccddeeff00112233445566778899aabbccddeeff";

fn fixed() -> Seed {
    FIXED.parse().unwrap()
}

/// Tests that a seed prints back in the form it was parsed from.
#[test]
fn test_seed_text_form() {
    let seed = fixed();
    assert_eq!(seed.to_string(), FIXED);
    assert_eq!(FIXED[2..].parse::<Seed>().unwrap(), seed, "The 0x prefix is optional");
    assert!(
        !format!("{seed:?}").contains(&FIXED[2..]),
        "Debug output shows the hash, never the seed"
    );
    assert_eq!(seed.hash_hex().len(), 66);
}

/// Tests the two ways a seed string can be malformed.
#[test]
fn test_malformed_seeds() {
    assert!(matches!(
        "0x1234".parse::<Seed>(),
        Err(Error::InvalidSeedLength(4))
    ));
    assert!(matches!(
        Seed::from_hex(&"zz".repeat(32)),
        Err(Error::InvalidSeedHex)
    ));
}

/// Tests that the run RNG is reproducible and depends on the seed.
#[test]
fn test_run_rng_follows_seed() {
    let a: Vec<u64> = {
        let mut rng = fixed().create_deterministic_rng();
        (0..4).map(|_| rng.next_u64()).collect()
    };
    let b: Vec<u64> = {
        let mut rng = fixed().create_deterministic_rng();
        (0..4).map(|_| rng.next_u64()).collect()
    };
    assert_eq!(a, b);

    let mut other = Seed::from_hex(&"11".repeat(32))
        .unwrap()
        .create_deterministic_rng();
    assert_ne!(a[0], other.next_u64());
}

/// Tests that labelled streams are reproducible and independent of each other.
#[test]
fn test_streams_are_independent() {
    let seed = fixed();
    let draw = |label: &str| -> [u32; 4] { seed.stream(label).random() };

    assert_eq!(draw("Reorder/0"), draw("Reorder/0"));
    assert_ne!(draw("Reorder/0"), draw("Reorder/1"));
    assert_ne!(draw("Reorder/0"), draw("Branch/0"));
}
