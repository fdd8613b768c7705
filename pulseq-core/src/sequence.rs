use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufRead, BufReader, Seek},
    path::Path,
    sync::Arc,
};

use pulseq_types::{
    AdcEvent, ClampStats, ControlEvent, DiagnosticSink, GradEvent, MaterializedBlock,
    MessageLevel, RfEvent, SeqError, SeqResult, SeqVersion,
};

use crate::{
    blocks::BlockTable,
    config::{LoadConfig, SequenceSource},
    definitions::Definitions,
    diagnostics::LogSink,
    library::EventLibraries,
    materialize::BlockMaterializer,
    shapes::ShapeLibrary,
    text::LineReader,
    version::read_version,
    SectionIndex,
};

/// Загруженная внешняя последовательность.
///
/// Все библиотеки и таблица блоков неизменяемы после загрузки;
/// материализация блоков не требует блокировок.
#[derive(Debug, Clone)]
pub struct ExternalSequence {
    source: Option<SequenceSource>,
    version: SeqVersion,
    shapes: ShapeLibrary,
    events: EventLibraries,
    definitions: Definitions,
    blocks: BlockTable,
}

/// Загрузчик последовательностей с параметрами и приёмником сообщений.
#[derive(Clone)]
pub struct SequenceLoader {
    config: LoadConfig,
    sink: Arc<dyn DiagnosticSink>,
}

/// Результат чтения части с формами.
struct ShapesPart {
    version: SeqVersion,
    shapes: ShapeLibrary,
}

/// Результат чтения части с блоками.
struct BlocksPart {
    definitions: Definitions,
    blocks: BlockTable,
}

////////////////////////////////////////////////////////////////////////////////
// SequenceLoader
////////////////////////////////////////////////////////////////////////////////

impl SequenceLoader {
    pub fn new(config: LoadConfig) -> Self {
        Self {
            config,
            sink: Arc::new(LogSink::default()),
        }
    }

    /// Заменяет приёмник диагностических сообщений.
    pub fn with_sink(
        mut self,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &LoadConfig {
        &self.config
    }

    pub fn sink(&self) -> &dyn DiagnosticSink {
        self.sink.as_ref()
    }

    /// Загружает последовательность по пути (файл `.seq` или каталог).
    pub fn load<P: AsRef<Path>>(
        &self,
        path: P,
    ) -> SeqResult<ExternalSequence> {
        let source = SequenceSource::resolve(path, &self.config);
        self.load_source(&source)
    }

    pub fn load_source(
        &self,
        source: &SequenceSource,
    ) -> SeqResult<ExternalSequence> {
        self.sink
            .emit(MessageLevel::DebugHigh, "Reading external sequence files");

        let result = match source {
            SequenceSource::Single(path) => self.open(path).and_then(|r| self.read_single(r)),
            SequenceSource::Split {
                shapes,
                events,
                blocks,
            } => self.open(shapes).and_then(|s| {
                let e = self.open(events)?;
                let b = self.open(blocks)?;
                self.read_split(s, e, b)
            }),
        };

        self.finish(result).map(|mut seq| {
            seq.source = Some(source.clone());
            seq
        })
    }

    /// Загружает единый файл из произвольного потока.
    pub fn load_reader<R: BufRead + Seek>(
        &self,
        reader: R,
    ) -> SeqResult<ExternalSequence> {
        self.sink
            .emit(MessageLevel::DebugHigh, "Reading external sequence");

        let result = self.read_single(self.line_reader(reader));
        self.finish(result)
    }

    /// Загружает раздельную раскладку из трёх потоков.
    pub fn load_split_readers<S, E, B>(
        &self,
        shapes: S,
        events: E,
        blocks: B,
    ) -> SeqResult<ExternalSequence>
    where
        S: BufRead + Seek,
        E: BufRead + Seek,
        B: BufRead + Seek,
    {
        self.sink
            .emit(MessageLevel::DebugHigh, "Reading external sequence");

        let result = self.read_split(
            self.line_reader(shapes),
            self.line_reader(events),
            self.line_reader(blocks),
        );
        self.finish(result)
    }

    fn open(
        &self,
        path: &Path,
    ) -> SeqResult<LineReader<BufReader<File>>> {
        let file = File::open(path).map_err(|source| SeqError::FileOpen {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(self.line_reader(BufReader::new(file)))
    }

    fn line_reader<R: BufRead + Seek>(
        &self,
        inner: R,
    ) -> LineReader<R> {
        LineReader::with_limits(inner, self.config.max_line_len, self.config.comment_char)
    }

    fn read_single<R: BufRead + Seek>(
        &self,
        mut reader: LineReader<R>,
    ) -> SeqResult<ExternalSequence> {
        let index = self.index(&mut reader)?;

        let ShapesPart { version, shapes } = self.read_shapes(&mut reader, &index)?;
        let events = self.read_events(&mut reader, &index, &version)?;
        let BlocksPart {
            definitions,
            blocks,
        } = self.read_blocks(&mut reader, &index, &events)?;

        self.report_truncated(reader.truncated_lines());

        Ok(ExternalSequence {
            source: None,
            version,
            shapes,
            events,
            definitions,
            blocks,
        })
    }

    /// Каждый файл получает собственный индекс секций; версия берётся из
    /// файла форм.
    fn read_split<S, E, B>(
        &self,
        mut shapes_reader: LineReader<S>,
        mut events_reader: LineReader<E>,
        mut blocks_reader: LineReader<B>,
    ) -> SeqResult<ExternalSequence>
    where
        S: BufRead + Seek,
        E: BufRead + Seek,
        B: BufRead + Seek,
    {
        let index = self.index(&mut shapes_reader)?;
        let ShapesPart { version, shapes } = self.read_shapes(&mut shapes_reader, &index)?;

        let index = self.index(&mut events_reader)?;
        let events = self.read_events(&mut events_reader, &index, &version)?;

        let index = self.index(&mut blocks_reader)?;
        let BlocksPart {
            definitions,
            blocks,
        } = self.read_blocks(&mut blocks_reader, &index, &events)?;

        self.report_truncated(
            shapes_reader.truncated_lines()
                + events_reader.truncated_lines()
                + blocks_reader.truncated_lines(),
        );

        Ok(ExternalSequence {
            source: None,
            version,
            shapes,
            events,
            definitions,
            blocks,
        })
    }

    fn index<R: BufRead + Seek>(
        &self,
        reader: &mut LineReader<R>,
    ) -> SeqResult<SectionIndex> {
        self.sink.emit(MessageLevel::DebugLow, "Building index");
        Ok(SectionIndex::build(reader)?)
    }

    fn read_shapes<R: BufRead + Seek>(
        &self,
        reader: &mut LineReader<R>,
        index: &SectionIndex,
    ) -> SeqResult<ShapesPart> {
        let sink = self.sink.as_ref();
        let version = read_version(reader, index, sink)?;
        let shapes = ShapeLibrary::parse(reader, index, sink)?;

        Ok(ShapesPart { version, shapes })
    }

    fn read_events<R: BufRead + Seek>(
        &self,
        reader: &mut LineReader<R>,
        index: &SectionIndex,
        version: &SeqVersion,
    ) -> SeqResult<EventLibraries> {
        EventLibraries::parse(reader, index, version, self.sink.as_ref())
    }

    fn read_blocks<R: BufRead + Seek>(
        &self,
        reader: &mut LineReader<R>,
        index: &SectionIndex,
        events: &EventLibraries,
    ) -> SeqResult<BlocksPart> {
        let sink = self.sink.as_ref();
        let definitions = Definitions::parse(reader, index, sink)?;
        let blocks = BlockTable::parse(
            reader,
            index,
            events,
            self.config.warn_on_block_index_mismatch,
            sink,
        )?;

        if let Some(expected) = definitions.num_blocks()? {
            if expected != blocks.len() {
                return Err(SeqError::BlockCount {
                    expected,
                    found: blocks.len(),
                });
            }
        }

        Ok(BlocksPart {
            definitions,
            blocks,
        })
    }

    fn report_truncated(
        &self,
        count: u64,
    ) {
        if count > 0 {
            self.sink.emit(
                MessageLevel::Warning,
                &format!(
                    "{count} lines exceeded {} bytes and were truncated",
                    self.config.max_line_len
                ),
            );
        }
    }

    /// Сообщает ошибку загрузки или печатает заголовок успешной.
    fn finish(
        &self,
        result: SeqResult<ExternalSequence>,
    ) -> SeqResult<ExternalSequence> {
        match result {
            Ok(seq) => {
                let rule = "=".repeat(42);
                self.sink.emit(MessageLevel::Normal, &rule);
                self.sink.emit(
                    MessageLevel::Normal,
                    &format!("===== EXTERNAL SEQUENCE #{:>5} ===========", seq.scan_id()),
                );
                self.sink.emit(MessageLevel::Normal, &rule);
                Ok(seq)
            }
            Err(e) => {
                self.sink
                    .emit(MessageLevel::Error, &format!("*** ERROR: {e}"));
                Err(e)
            }
        }
    }
}

impl Default for SequenceLoader {
    fn default() -> Self {
        Self::new(LoadConfig::default())
    }
}

impl std::fmt::Debug for SequenceLoader {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("SequenceLoader")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

////////////////////////////////////////////////////////////////////////////////
// ExternalSequence
////////////////////////////////////////////////////////////////////////////////

impl ExternalSequence {
    /// Загружает последовательность с настройками по умолчанию; сообщения
    /// уходят в `log`.
    pub fn load<P: AsRef<Path>>(path: P) -> SeqResult<Self> {
        SequenceLoader::default().load(path)
    }

    /// Перечитывает последовательность. Текущее состояние заменяется только
    /// при успешной загрузке.
    pub fn reload<P: AsRef<Path>>(
        &mut self,
        loader: &SequenceLoader,
        path: P,
    ) -> SeqResult<()> {
        *self = loader.load(path)?;
        Ok(())
    }

    /// Откуда была загружена последовательность (`None` для потоков).
    pub fn source(&self) -> Option<&SequenceSource> {
        self.source.as_ref()
    }

    pub fn version(&self) -> SeqVersion {
        self.version
    }

    pub fn definitions(&self) -> &Definitions {
        &self.definitions
    }

    pub fn definition(
        &self,
        key: &str,
    ) -> Option<&[f64]> {
        self.definitions.get(key)
    }

    pub fn scan_id(&self) -> i64 {
        self.definitions.scan_id()
    }

    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    pub fn blocks(&self) -> &BlockTable {
        &self.blocks
    }

    pub fn events(&self) -> &EventLibraries {
        &self.events
    }

    pub fn shape_library(&self) -> &ShapeLibrary {
        &self.shapes
    }

    pub fn rf_library(&self) -> &BTreeMap<u32, RfEvent> {
        self.events.rf_library()
    }

    pub fn grad_library(&self) -> &BTreeMap<u32, GradEvent> {
        self.events.grad_library()
    }

    pub fn adc_library(&self) -> &BTreeMap<u32, AdcEvent> {
        self.events.adc_library()
    }

    pub fn delay_library(&self) -> &BTreeMap<u32, i64> {
        self.events.delay_library()
    }

    pub fn control_library(&self) -> &BTreeMap<u32, ControlEvent> {
        self.events.control_library()
    }

    pub fn materializer(&self) -> BlockMaterializer<'_> {
        BlockMaterializer::new(self.version, &self.shapes, &self.events, &self.blocks)
    }

    pub fn materialize(
        &self,
        index: usize,
    ) -> SeqResult<MaterializedBlock> {
        self.materializer().materialize(index)
    }

    pub fn decode(
        &self,
        block: &mut MaterializedBlock,
    ) -> SeqResult<ClampStats> {
        self.materializer().decode(block)
    }

    /// Материализует и декодирует блок.
    pub fn decoded_block(
        &self,
        index: usize,
    ) -> SeqResult<(MaterializedBlock, ClampStats)> {
        self.materializer().decoded(index)
    }

    /// Сумма длительностей всех блоков (без распаковки форм).
    pub fn total_duration(&self) -> SeqResult<i64> {
        let m = self.materializer();
        (0..self.blocks.len()).try_fold(0i64, |total, i| {
            let duration = m.materialize(i)?.duration;
            total
                .checked_add(duration)
                .ok_or(SeqError::DurationOverflow { block: i })
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use pulseq_types::ErrorKind;

    use super::*;
    use crate::diagnostics::{MemorySink, NullSink};

    const SEQ: &str = "\
# test sequence
[VERSION]
major 1
minor 2
revision 0

[DEFINITIONS]
Scan_ID 12
Num_Blocks 2

[BLOCKS]
1 0 1 0 0 0 0 0
2 1 0 1 0 0 0 0

[RF]
1 250 1 0 0 0 0

[TRAP]
1 1000 100 1000 100 0

[DELAYS]
1 5000

[SHAPES]

shape 1
num_samples 5
1
1
3
";

    fn loader(sink: Arc<dyn DiagnosticSink>) -> SequenceLoader {
        SequenceLoader::default().with_sink(sink)
    }

    #[test]
    fn test_load_reader() {
        let seq = loader(Arc::new(NullSink))
            .load_reader(Cursor::new(SEQ.as_bytes()))
            .unwrap();

        assert_eq!(seq.version(), SeqVersion::new(1, 2, 0));
        assert_eq!(seq.num_blocks(), 2);
        assert_eq!(seq.scan_id(), 12);
        assert!(seq.source().is_none());
        assert_eq!(seq.rf_library().len(), 1);
        assert_eq!(seq.delay_library().get(&1), Some(&5000));
        assert_eq!(seq.materialize(0).unwrap().duration, 5);
        assert_eq!(seq.materialize(1).unwrap().duration, 5000);
        assert_eq!(seq.total_duration().unwrap(), 5005);
    }

    #[test]
    fn test_banner_and_summaries() {
        let sink = Arc::new(MemorySink::new());
        loader(sink.clone())
            .load_reader(Cursor::new(SEQ.as_bytes()))
            .unwrap();

        assert!(sink.contains(MessageLevel::Normal, "EXTERNAL SEQUENCE #   12"));
        assert!(sink.contains(MessageLevel::DebugHigh, "-- SHAPES READ numShapes: 1"));
        assert!(sink.contains(MessageLevel::DebugHigh, "-- BLOCKS READ: 2"));
        assert_eq!(sink.count(MessageLevel::Error), 0);
    }

    #[test]
    fn test_block_count_mismatch() {
        let text = SEQ.replace("Num_Blocks 2", "Num_Blocks 3");
        let sink = Arc::new(MemorySink::new());
        let err = loader(sink.clone())
            .load_reader(Cursor::new(text.into_bytes()))
            .unwrap_err();

        assert!(matches!(
            err,
            SeqError::BlockCount {
                expected: 3,
                found: 2
            }
        ));
        assert_eq!(err.kind(), ErrorKind::Consistency);
        assert!(sink.contains(MessageLevel::Error, "Expected 3 blocks"));
    }

    #[test]
    fn test_invalid_num_blocks_fails_load() {
        for value in ["-1", "2.5", ""] {
            let text = SEQ.replace("Num_Blocks 2", &format!("Num_Blocks {value}"));
            let sink = Arc::new(MemorySink::new());
            let err = loader(sink.clone())
                .load_reader(Cursor::new(text.into_bytes()))
                .unwrap_err();

            assert_eq!(err.kind(), ErrorKind::Format, "Num_Blocks {value:?}");
            assert!(sink.contains(MessageLevel::Error, "Num_Blocks"));
        }
    }

    #[test]
    fn test_total_duration_overflow() {
        let text = SEQ
            .replace("1 0 1 0 0 0 0 0", "1 1 1 0 0 0 0 0")
            .replace("1 5000\n", "1 5000000000000000000\n");
        let seq = loader(Arc::new(NullSink))
            .load_reader(Cursor::new(text.into_bytes()))
            .unwrap();

        assert_eq!(seq.materialize(1).unwrap().duration, 5_000_000_000_000_000_000);
        assert!(matches!(
            seq.total_duration(),
            Err(SeqError::DurationOverflow { block: 1 })
        ));
    }

    #[test]
    fn test_adc_window_overflow_reported_on_materialize() {
        let text = SEQ
            .replace("2 1 0 1 0 0 0 0", "2 0 0 0 0 0 1 0")
            .replace("[DELAYS]", "[ADC]\n1 10000000000 10000000000 0 0 0\n\n[DELAYS]");
        let seq = loader(Arc::new(NullSink))
            .load_reader(Cursor::new(text.into_bytes()))
            .unwrap();

        assert!(seq.materialize(0).is_ok());
        assert!(matches!(
            seq.materialize(1),
            Err(SeqError::DurationOverflow { block: 1 })
        ));
    }

    #[test]
    fn test_missing_shapes_section() {
        let text = SEQ.split("[SHAPES]").next().unwrap_or_default().to_string();
        let err = loader(Arc::new(NullSink))
            .load_reader(Cursor::new(text.into_bytes()))
            .unwrap_err();
        assert!(matches!(err, SeqError::MissingSection(ref s) if s == "[SHAPES]"));
    }

    #[test]
    fn test_long_lines_warned() {
        let text = SEQ.replace("# test sequence", &format!("# {}", "x".repeat(400)));
        let sink = Arc::new(MemorySink::new());
        loader(sink.clone())
            .load_reader(Cursor::new(text.into_bytes()))
            .unwrap();
        assert!(sink.contains(MessageLevel::Warning, "truncated"));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ExternalSequence::load(dir.path().join("absent.seq")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(matches!(err, SeqError::FileOpen { .. }));
    }

    #[test]
    fn test_reload_keeps_state_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.seq");
        std::fs::write(&good, SEQ).unwrap();

        let loader = loader(Arc::new(NullSink));
        let mut seq = loader.load(&good).unwrap();
        assert_eq!(
            seq.source(),
            Some(&SequenceSource::Single(good.clone()))
        );

        assert!(seq.reload(&loader, dir.path().join("missing.seq")).is_err());
        assert_eq!(seq.num_blocks(), 2);
        assert_eq!(seq.source(), Some(&SequenceSource::Single(good)));
    }
}
