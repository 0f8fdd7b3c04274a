//! Test fixtures: manifest documents and a stand-in compiler.

use serde_json::json;

use super::TEST_DOWNLOAD_TEMPLATE;

/// An `index.json` listing `compilers`.
pub fn index_json(compilers: &[&str]) -> String {
    json!({ "compilers": compilers }).to_string()
}

/// A `<compiler>.json` release document without checksums.
pub fn release_json(compiler: &str, backends: &[&str]) -> String {
    json!({
        "compiler": compiler,
        "backends": backends,
        "download_url": TEST_DOWNLOAD_TEMPLATE,
    })
    .to_string()
}

/// A release document with a sha256 per backend.
pub fn release_json_with_checksums(compiler: &str, backends: &[(&str, &str)]) -> String {
    let names: Vec<&str> = backends.iter().map(|(b, _)| *b).collect();
    let sha256: serde_json::Map<String, serde_json::Value> = backends
        .iter()
        .map(|(b, digest)| (b.to_string(), json!(digest)))
        .collect();

    json!({
        "compiler": compiler,
        "backends": names,
        "download_url": TEST_DOWNLOAD_TEMPLATE,
        "sha256": sha256,
    })
    .to_string()
}

const FAKE_COMPILER: &str = r#"#!/bin/sh
if [ "$1" = "--version" ]; then
    echo "Vyper to EraVM compiler v@VERSION@"
    exit 0
fi
last=""
prev=""
vyper=""
for arg in "$@"; do
    if [ "$prev" = "--vyper" ]; then vyper="$arg"; fi
    prev="$arg"
    last="$arg"
done
if grep -q "hang" "$last"; then
    sleep 30
fi
if grep -q "garbage" "$last"; then
    echo "this is not json"
    exit 0
fi
if grep -q "invalid" "$last"; then
    echo "$last:1: invalid syntax" >&2
    exit 1
fi
if [ -n "$vyper" ]; then
    printf '{"version": "@VERSION@", "vyper": "%s", "%s": {"bytecode": "0x00", "abi": []}}\n' \
        "$vyper" "$last"
    exit 0
fi
printf '{"version": "@VERSION@", "%s": {"bytecode": "0x00", "abi": []}}\n' "$last"
"#;

/// A shell script that behaves like a tiny zkVyper `@VERSION@` binary.
///
/// `--version` prints the version. Otherwise it compiles the last argument
/// into `{"version": .., "<path>": {"bytecode": "0x00", "abi": []}}`, adding
/// a top-level `"vyper"` key when given `--vyper <path>`, unless
/// the source contains `invalid` (exit 1 with a message on stderr),
/// `garbage` (non-JSON output) or `hang` (sleeps).
pub fn fake_compiler(version: &str) -> Vec<u8> {
    FAKE_COMPILER.replace("@VERSION@", version).into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::manifest::parse_index;
    use crate::core::RemoteRelease;

    #[test]
    fn test_fixtures_parse() {
        assert_eq!(parse_index(index_json(&["1.1.0"]).as_bytes()).unwrap().len(), 1);

        let release = RemoteRelease::from_json(
            release_json_with_checksums("1.1.1", &[("0.3.3", "AB")]).as_bytes(),
        )
        .unwrap();
        assert_eq!(release.sha256.values().next().map(String::as_str), Some("ab"));
    }
}
