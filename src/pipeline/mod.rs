//! Pipeline stages for image-only PDF transcription.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested on its own and swapped without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ select ──▶ encode ──▶ recognize ──▶ assemble
//! (bytes)   (markers)   (filter)   (base64)   (VLM)         (labels)
//!                                              ▲
//!                                           pacing
//! ```
//!
//! 1. [`input`]     — read the source file into memory
//! 2. [`extract`]   — locate JPEG (else PNG) streams by their byte markers
//! 3. [`select`]    — drop icon-sized images, cap the batch
//! 4. [`encode`]    — copy each selected image out as a base64 payload
//! 5. [`recognize`] — one VLM call per image; the only stage with network I/O
//! 6. [`pacing`]    — minimum spacing between consecutive calls
//! 7. [`assemble`]  — labeled blocks in batch order

pub mod assemble;
pub mod encode;
pub mod extract;
pub mod input;
pub mod pacing;
pub mod recognize;
pub mod select;
