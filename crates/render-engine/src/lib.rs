//! Suncast Render Engine
//!
//! Turns raw archive frames into the final animation:
//!
//! ```text
//! originals/*.jpg ── FrameTransformer ──► ProcessedFrame (in memory)
//!                                              │
//!                                         Assembler
//!                                              │
//!                        scratch frames ── encode ── optimize
//!                                                        │
//!                                                        ▼
//!                                                gifs/YYYY_MM_DD_HH.gif
//! ```

pub mod assemble;
pub mod transform;

pub use assemble::*;
pub use transform::*;
