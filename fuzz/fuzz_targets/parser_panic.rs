#![no_main]
use libfuzzer_sys::fuzz_target;
use lsflog::{JobTable, LsfParser};

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes through the reader path, then the table writer.
    let Ok(events) = LsfParser::new().parse_reader(data) else {
        return;
    };
    let records: Vec<_> = events.into_iter().filter_map(|e| e.into_record()).collect();
    let _ = JobTable::from_records(&records).write_tsv(std::io::sink());
});
