//! Загрузчик внешних последовательностей Pulseq
//!
//! Читает текстовое описание MRI-последовательности (формы, библиотеки
//! событий, таблицу блоков) и по запросу собирает конкретные блоки:
//! разыменовывает события, распаковывает формы, вычисляет длительность и
//! ограничивает выборки.
//!
//! # Быстрый старт
//!
//! ```no_run
//! use pulseq_core::ExternalSequence;
//!
//! let seq = ExternalSequence::load("scan/external.seq")?;
//! println!("version {}, {} blocks", seq.version(), seq.num_blocks());
//!
//! let (block, clamped) = seq.decoded_block(0)?;
//! println!("duration {} ({} samples clamped)", block.duration, clamped.total());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod blocks;
pub mod config;
pub mod definitions;
pub mod diagnostics;
pub mod format;
pub mod library;
pub mod materialize;
pub mod sequence;
pub mod shapes;
pub mod text;
pub mod version;

pub use blocks::*;
pub use config::*;
pub use definitions::*;
pub use diagnostics::*;
pub use format::*;
pub use library::*;
pub use materialize::*;
pub use sequence::*;
pub use shapes::*;
pub use version::*;

/// Версия библиотеки.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
