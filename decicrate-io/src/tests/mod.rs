//! Test modules for decicrate-io
//!
//! Round trips through files on disk and parsing of hand-written OBJ text.
