//! Cross-crate behavior tests; everything lives under `tests/`.
