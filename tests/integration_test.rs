use lzkit::codec::{deflate, lz4, lzma};
use lzkit::container::{gzip, xz, zlib};
use lzkit::{adler32, get_codec, CodecId, CompressionMethod, Error, Level, ZipArchive, ZipWriter};
use proptest::prelude::*;

fn sample_text() -> Vec<u8> {
    let mut out = Vec::new();
    for i in 0..2000u32 {
        out.extend_from_slice(format!("record {:04} status={} ok\n", i % 97, i % 3).as_bytes());
    }
    out
}

#[test]
fn test_every_codec_roundtrips_text() {
    let data = sample_text();
    for id in CodecId::ALL {
        let codec = get_codec(id);
        for level in [Level::NONE, Level::FASTEST, Level::DEFAULT, Level::BEST] {
            let packed = codec.compress(&data, level).unwrap();
            assert_eq!(codec.decompress(&packed).unwrap(), data, "{} at {:?}", id.name(), level);
        }
    }
}

#[test]
fn test_every_codec_roundtrips_empty() {
    for id in CodecId::ALL {
        let codec = get_codec(id);
        let packed = codec.compress(b"", Level::DEFAULT).unwrap();
        assert_eq!(codec.decompress(&packed).unwrap(), b"", "{}", id.name());
    }
}

#[test]
fn test_repeated_byte_compacts() {
    for n in [64usize, 65, 1000, 70_000] {
        let data = vec![b'z'; n];
        for id in CodecId::ALL {
            let packed = get_codec(id).compress(&data, Level::DEFAULT).unwrap();
            // Container framing is fixed overhead; the payload must still shrink.
            assert!(packed.len() < data.len(), "{} grew {} -> {}", id.name(), n, packed.len());
        }
    }
}

#[test]
fn test_containers_carry_their_magic() {
    for id in [CodecId::Gzip, CodecId::Zlib, CodecId::Xz] {
        let packed = get_codec(id).compress(b"sniff me", Level::DEFAULT).unwrap();
        assert!(packed.starts_with(id.magic().unwrap()), "{}", id.name());
    }
    assert!(gzip::is_gzip(&gzip::encode(b"x", Level::DEFAULT).unwrap()));
    assert!(zlib::is_zlib(&zlib::encode(b"x", Level::BEST).unwrap()));
    assert!(xz::encode(b"x").unwrap().starts_with(&xz::HEADER_MAGIC));
}

#[test]
fn test_wrong_container_is_invalid_magic() {
    let z = zlib::encode(b"payload", Level::DEFAULT).unwrap();
    assert!(matches!(gzip::decode(&z), Err(Error::InvalidMagic { .. })));
    assert!(matches!(xz::decode(&z), Err(Error::InvalidMagic { .. })));
    let g = gzip::encode(b"payload", Level::DEFAULT).unwrap();
    assert!(matches!(zlib::decode(&g), Err(Error::InvalidMagic { .. })));
}

#[test]
fn test_trailer_bit_flips_are_checksum_mismatches() {
    let data = sample_text();

    let z = zlib::encode(&data, Level::DEFAULT).unwrap();
    for i in z.len() - 4..z.len() {
        for bit in 0..8 {
            let mut bad = z.clone();
            bad[i] ^= 1 << bit;
            assert!(matches!(zlib::decode(&bad), Err(Error::ChecksumMismatch { .. })));
        }
    }

    // The xz-like data check is the last four bytes before index and footer.
    let x = xz::encode(&data).unwrap();
    let index_len = 12; // marker, count, two multi-byte sizes, pad, crc
    let check = x.len() - 12 - index_len - 4;
    for i in check..check + 4 {
        for bit in 0..8 {
            let mut bad = x.clone();
            bad[i] ^= 1 << bit;
            assert!(matches!(xz::decode(&bad), Err(Error::ChecksumMismatch { .. })));
        }
    }
}

#[test]
fn test_adler32_known_vector() {
    assert_eq!(adler32(b"Wikipedia"), 0x11E6_0398);
}

#[test]
fn test_zero_offset_never_accepted() {
    // A match token pointing at offset 0, in each grammar.
    assert!(matches!(deflate::decode(&[b'a', 0xFF, 0, 0, 3, 0x00]), Err(Error::InvalidOffset { offset: 0, .. })));
    assert!(matches!(lzma::decode_raw(&[0x81, b'a', 0x01, 0x00], 4), Err(Error::InvalidOffset { offset: 0, .. })));
    assert!(matches!(lz4::decode_block(&[0x10, b'a', 0, 0, 0x00], 5), Err(Error::InvalidOffset { offset: 0, .. })));
}

#[test]
fn test_offset_past_start_never_accepted() {
    assert!(matches!(
        deflate::decode(&[b'a', 0xFF, 2, 0, 3, 0x00]),
        Err(Error::InvalidOffset { offset: 2, available: 1 })
    ));
    assert!(matches!(
        lz4::decode_block(&[0x10, b'a', 9, 0, 0x00], 5),
        Err(Error::InvalidOffset { offset: 9, available: 1 })
    ));
}

#[test]
fn test_zip_writer_output_opens_and_extracts() {
    let text = sample_text();
    let mut w = ZipWriter::with_level(Level::BEST);
    w.add_file("data/log.txt", &text, CompressionMethod::Deflate).unwrap();
    w.add_file("data/raw.bin", &[0, 1, 2, 3, 4], CompressionMethod::Stored).unwrap();
    w.add_directory("empty/").unwrap();
    let bytes = w.finish(b"lzkit archive").unwrap();

    let archive = ZipArchive::open(&bytes).unwrap();
    let names: Vec<&str> = archive.entries().iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, ["data/log.txt", "data/raw.bin", "empty/"]);
    assert_eq!(archive.comment(), b"lzkit archive");

    for entry in archive.entries() {
        let out = archive.extract(entry, &bytes).unwrap();
        assert_eq!(out.len() as u64, entry.uncompressed_size);
    }
    assert_eq!(archive.extract(&archive.entries()[0], &bytes).unwrap(), text);
}

#[test]
fn test_zip_entry_count_mismatch() {
    let mut w = ZipWriter::new();
    w.add_file("a", b"a", CompressionMethod::Stored).unwrap();
    w.add_file("b", b"b", CompressionMethod::Stored).unwrap();
    let mut bytes = w.finish(b"").unwrap();

    // Total-entries field of the end record (offset 10), and the
    // on-this-disk count (offset 8) kept consistent with it.
    let eocd = bytes.len() - 22;
    for declared in [1u16, 3] {
        bytes[eocd + 8..eocd + 10].copy_from_slice(&declared.to_le_bytes());
        bytes[eocd + 10..eocd + 12].copy_from_slice(&declared.to_le_bytes());
        assert!(matches!(ZipArchive::open(&bytes), Err(Error::InvalidZipArchive(_))));
    }
}

#[test]
fn test_zip_corrupted_member_detected() {
    let mut w = ZipWriter::new();
    w.add_file("note", b"stored member", CompressionMethod::Stored).unwrap();
    let mut bytes = w.finish(b"").unwrap();
    let archive = ZipArchive::open(&bytes).unwrap();
    let entry = archive.by_name("note").unwrap().clone();
    bytes[entry.data_offset as usize] ^= 0x01;
    assert!(matches!(archive.extract(&entry, &bytes), Err(Error::ChecksumMismatch { .. })));
}

fn arb_input() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        proptest::collection::vec(any::<u8>(), 0..2048),
        // Small alphabets produce matches, runs and overlapping copies.
        proptest::collection::vec(0u8..4, 0..4096),
        (any::<u8>(), 1usize..1200).prop_map(|(b, n)| vec![b; n]),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_roundtrip_all_codecs(data in arb_input(), level in 0u32..=9) {
        for id in CodecId::ALL {
            let codec = get_codec(id);
            let packed = codec.compress(&data, Level::new(level)).unwrap();
            prop_assert_eq!(codec.decompress(&packed).unwrap(), data.clone(), "{}", id.name());
        }
    }

    #[test]
    fn prop_truncation_is_invalid_data(data in arb_input(), cut in any::<prop::sample::Index>()) {
        for id in CodecId::ALL {
            let codec = get_codec(id);
            let packed = codec.compress(&data, Level::DEFAULT).unwrap();
            let cut = cut.index(packed.len());
            prop_assert_eq!(codec.decompress(&packed[..cut]), Err(Error::InvalidData), "{}", id.name());
        }
    }

    #[test]
    fn prop_random_input_never_panics(data in proptest::collection::vec(any::<u8>(), 0..512)) {
        for id in CodecId::ALL {
            let _ = get_codec(id).decompress(&data);
        }
        let _ = lzma::decode_raw(&data, 4096);
        let _ = lz4::decode_block(&data, 4096);
        if let Ok(archive) = ZipArchive::open(&data) {
            for entry in archive.entries() {
                let _ = archive.extract(entry, &data);
            }
        }
    }

    #[test]
    fn prop_successful_decode_is_consistent(data in proptest::collection::vec(any::<u8>(), 0..256)) {
        // Whatever arbitrary bytes decode to must re-encode and decode back.
        if let Ok(out) = deflate::decode(&data) {
            let again = deflate::encode(&out, Level::DEFAULT).unwrap();
            prop_assert_eq!(deflate::decode(&again).unwrap(), out);
        }
    }
}
