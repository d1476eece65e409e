use recording::{PixelFormat, RecordingHeader, RecordingReader, RecordingWriter};
use tempfile::TempDir;

fn header() -> RecordingHeader {
    RecordingHeader {
        device_name: "Intel RealSense D415".to_string(),
        serial_number: "822512060".to_string(),
        color_format: PixelFormat::Rgb8,
        depth_format: PixelFormat::Z16,
        width: 8,
        height: 4,
        fps: 15.0,
        depth_fps: 15.0,
        stream_length_us: 0,
    }
}

/// Write a recording with repeated deliveries and read it back
///
/// Tests:
/// - Frame-sized payloads survive the memory map byte for byte
/// - Repeated records are kept (filtering is the reader's job)
/// - Timestamp seeking lands on the first record at or after the target
/// - Metadata serialises with the device field names
#[test]
fn test_recording_round_trip_with_repeats() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("capture.frec");
    let frame_size = PixelFormat::Rgb8.frame_size(8, 4);
    let period = header().frame_period_us();

    let mut writer = RecordingWriter::create(&path, header()).unwrap();
    for sequence in 0..12u64 {
        let payload: Vec<u8> = (0..frame_size).map(|i| (i as u64 + sequence) as u8).collect();
        writer
            .write_frame(sequence, sequence * period, &payload)
            .unwrap();
        if sequence == 5 {
            writer
                .write_frame(sequence, sequence * period, &payload)
                .unwrap();
        }
    }
    let stored = writer.finish().unwrap();
    assert_eq!(stored.stream_length_us, 12 * period);

    let reader = RecordingReader::open(&path).unwrap();
    assert_eq!(reader.path(), path.as_path());
    assert_eq!(reader.header(), &stored);
    assert_eq!(reader.len(), 13);

    let sequences: Vec<_> = reader.entries().iter().map(|e| e.sequence).collect();
    assert_eq!(sequences, vec![0, 1, 2, 3, 4, 5, 5, 6, 7, 8, 9, 10, 11]);

    let record = reader.record(7).unwrap();
    assert_eq!(record.sequence, 6);
    assert_eq!(record.data.len(), frame_size);
    assert_eq!(record.data[0], 6);

    assert_eq!(reader.seek_index(5 * period), 5);
    assert_eq!(reader.seek_index(5 * period + 1), 7);

    let json = serde_json::to_value(reader.header().color_format).unwrap();
    assert_eq!(json, "RGB8");
}

#[test]
fn test_non_recording_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, b"this is definitely not a frame recording").unwrap();

    assert!(matches!(
        RecordingReader::open(&path),
        Err(recording::RecordingError::BadMagic)
    ));
}
