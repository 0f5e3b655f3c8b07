//! Property tests for path resolution and the filter chain

use proptest::prelude::*;
use std::path::Path;
use winws_core::{chain, paths, FilterChainConfig};

const FIXED_TOKENS: &[&str] = &[
    "--new",
    "--filter-tcp=443",
    "--filter-tcp=80",
    "--filter-tcp=440-445",
    "--filter-udp=443",
    "--hostlist=other.txt",
    "--hostlist=@list-general.txt",
    "--hostlist-exclude=list-exclude.txt",
    "--hostlist-domains=example.com",
    "--ipset=ipset-all.txt",
    "--ipset-ip=1.1.1.1",
    "--wssize",
    "--dpi-desync-fake-tls=0x00000000",
    "--dpi-desync-fake-quic=quic_initial.bin",
];

fn token() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => prop::sample::select(FIXED_TOKENS).prop_map(|s| s.to_string()),
        1 => "--dpi-desync=[a-z]{1,8}",
        1 => "--dpi-desync-repeats=[0-9]{1,2}",
    ]
}

fn chain_config() -> impl Strategy<Value = FilterChainConfig> {
    (any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>()).prop_map(|(h, i, a, w)| FilterChainConfig {
        strip_hostlists: h,
        strip_ipsets: i,
        allzone_substitution: a,
        wssize_injection: w,
    })
}

proptest! {
    #[test]
    fn chain_is_idempotent(tokens in prop::collection::vec(token(), 0..24), config in chain_config()) {
        let dir = tempfile::tempdir().unwrap();
        let once = chain::apply(tokens, dir.path(), &config);
        let twice = chain::apply(once.clone(), dir.path(), &config);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn disabled_chain_preserves_tokens(tokens in prop::collection::vec(token(), 0..24)) {
        let dir = tempfile::tempdir().unwrap();
        let out = chain::apply(tokens.clone(), dir.path(), &FilterChainConfig::default());
        prop_assert_eq!(out, tokens);
    }

    #[test]
    fn stripping_keeps_relative_order(tokens in prop::collection::vec(token(), 0..24)) {
        let dir = tempfile::tempdir().unwrap();
        let config = FilterChainConfig { strip_hostlists: true, strip_ipsets: true, ..Default::default() };
        let out = chain::apply(tokens.clone(), dir.path(), &config);

        let expected: Vec<String> = tokens
            .into_iter()
            .filter(|t| !(t.starts_with("--hostlist") || t.starts_with("--ipset")))
            .collect();
        prop_assert_eq!(out, expected);
    }

    #[test]
    fn resolve_preserves_length_and_is_stable(tokens in prop::collection::vec(token(), 0..24)) {
        let work_dir = Path::new("/app");
        let once = paths::resolve(&tokens, work_dir);
        prop_assert_eq!(once.len(), tokens.len());
        for (before, after) in tokens.iter().zip(&once) {
            // Flags never change, only values
            let flag = |t: &str| t.split('=').next().unwrap_or_default().to_string();
            prop_assert_eq!(flag(before), flag(after));
        }
        prop_assert_eq!(paths::resolve(&once, work_dir), once);
    }
}

#[test]
fn wssize_port_logic() {
    let dir = tempfile::tempdir().unwrap();
    let config = FilterChainConfig { wssize_injection: true, ..Default::default() };

    let out = chain::apply(to_vec(&["--filter-tcp=80,443", "--dpi-desync=fake", "--new", "--filter-udp=443"]), dir.path(), &config);
    assert_eq!(
        out,
        to_vec(&[
            "--filter-tcp=80,443",
            "--dpi-desync=fake",
            "--wssize",
            "1:6",
            "--wssize-forced-cutoff=0",
            "--new",
            "--filter-udp=443"
        ])
    );

    let unchanged = to_vec(&["--filter-tcp=80", "--dpi-desync=fake"]);
    assert_eq!(chain::apply(unchanged.clone(), dir.path(), &config), unchanged);
}

fn to_vec(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
