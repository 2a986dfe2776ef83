//! Writing tests - fresh archives and merges back into a source archive.

mod merge;
mod roundtrip;
