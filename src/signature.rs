use ethereum_types::H256;
use tiny_keccak::{Hasher, Keccak};

use crate::Param;

/// Computes the keccak256 digest of `data`.
///
/// Every call owns its hasher for exactly one digest, so concurrent callers
/// never share hashing state.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut keccak_out = [0u8; 32];
    let mut hasher = Keccak::v256();
    hasher.update(data);
    hasher.finalize(&mut keccak_out);

    keccak_out
}

/// Canonical signature `name(type,type,...)`. Parameter names and `indexed`
/// flags are not part of it.
pub fn signature(name: &str, params: &[Param]) -> String {
    format!(
        "{}({})",
        name,
        params
            .iter()
            .map(|param| param.type_.to_string())
            .collect::<Vec<_>>()
            .join(",")
    )
}

/// First four bytes of the signature hash.
pub fn function_selector(signature: &str) -> [u8; 4] {
    let keccak_out = keccak256(signature.as_bytes());

    let mut selector = [0u8; 4];
    selector.copy_from_slice(&keccak_out[0..4]);

    selector
}

/// Full signature hash, used as an event's first topic.
pub fn event_topic(signature: &str) -> H256 {
    H256::from(keccak256(signature.as_bytes()))
}

#[cfg(test)]
mod test {
    use super::*;

    use std::{str::FromStr, thread};

    use crate::Type;

    #[test]
    fn keccak_vectors() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
        assert_eq!(
            hex::encode(keccak256(b"abc")),
            "4e03657aea45a94fc7d47ba826c8d667c0d1e6e33a64a036ec44f58fa12d6c45"
        );
    }

    #[test]
    fn selectors() {
        assert_eq!(
            function_selector("transfer(address,uint256)"),
            [0xa9, 0x05, 0x9c, 0xbb]
        );
        assert_eq!(function_selector("balanceOf(address)"), [0x70, 0xa0, 0x82, 0x31]);
        assert_eq!(function_selector("totalSupply()"), [0x18, 0x16, 0x0d, 0xdd]);
        assert_eq!(
            event_topic("Transfer(address,address,uint256)"),
            H256::from_str("ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef")
                .unwrap()
        );
    }

    #[test]
    fn signature_skips_names() {
        let params = vec![
            Param::indexed("from", Type::Address),
            Param::new("", Type::Array(Box::new(Type::Uint(8)))),
        ];

        assert_eq!(signature("Foo", &params), "Foo(address,uint8[])");
        assert_eq!(signature("bar", &[]), "bar()");
    }

    #[test]
    fn concurrent_hashing() {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                thread::spawn(move || {
                    (0..100)
                        .map(|_| keccak256(format!("f{}()", i).as_bytes()))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            let expected = keccak256(format!("f{}()", i).as_bytes());
            let digests = handle.join().unwrap();

            assert!(digests.iter().all(|digest| *digest == expected));
        }
    }
}
