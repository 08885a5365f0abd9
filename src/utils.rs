use anyhow::Result;
use blake3;
use std::fs::File;
use std::io::Read;

/// Compute Blake3 hash of file contents
pub fn compute_file_hash(file_path: &std::path::Path) -> Result<String> {
    let mut file = File::open(file_path)?;
    let mut hasher = blake3::Hasher::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hasher.finalize().to_hex().to_string())
}

/// Get file extension from path (without the dot)
pub fn get_extension(path: &std::path::Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|s| s.to_lowercase())
}

/// Split text into overlapping chunks of at most `max_chars` characters.
///
/// Chunks break on whitespace where possible so words stay intact, and each
/// chunk after the first starts `overlap_chars` before the end of the
/// previous one to keep context across boundaries. Character counts stand in
/// for tokens at the usual ~4 chars/token estimate. Never returns empty
/// chunks; boundaries always land on UTF-8 character boundaries.
pub fn chunk_text(text: &str, max_chars: usize, overlap_chars: usize) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() || max_chars == 0 {
        return Vec::new();
    }
    if text.chars().count() <= max_chars {
        return vec![text.to_string()];
    }

    // Overlap must leave room to make progress
    let overlap = overlap_chars.min(max_chars / 2);

    let chars: Vec<char> = text.chars().collect();
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let mut end = (start + max_chars).min(chars.len());

        // Back off to the last whitespace inside the window, keeping at
        // least half the window so a long unbroken run still chunks
        if end < chars.len() {
            if let Some(ws) = (start + max_chars / 2..end).rev().find(|&i| chars[i].is_whitespace()) {
                end = ws;
            }
        }

        let chunk: String = chars[start..end].iter().collect();
        let chunk = chunk.trim();
        if !chunk.is_empty() {
            chunks.push(chunk.to_string());
        }

        if end >= chars.len() {
            break;
        }
        start = end.saturating_sub(overlap).max(start + 1);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_compute_file_hash() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "test content").unwrap();
        file.flush().unwrap();

        let hash = compute_file_hash(file.path()).unwrap();
        assert!(!hash.is_empty());
        assert_eq!(hash.len(), 64); // Blake3 hex string length
    }

    #[test]
    fn test_compute_file_hash_consistent() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "same content").unwrap();
        file.flush().unwrap();

        let hash1 = compute_file_hash(file.path()).unwrap();
        let hash2 = compute_file_hash(file.path()).unwrap();

        assert_eq!(hash1, hash2);
    }

    #[test]
    fn test_compute_file_hash_different_content() {
        let mut file1 = NamedTempFile::new().unwrap();
        write!(file1, "content one").unwrap();
        file1.flush().unwrap();

        let mut file2 = NamedTempFile::new().unwrap();
        write!(file2, "content two").unwrap();
        file2.flush().unwrap();

        let hash1 = compute_file_hash(file1.path()).unwrap();
        let hash2 = compute_file_hash(file2.path()).unwrap();

        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_get_extension_with_txt() {
        let path = std::path::Path::new("/path/to/file.txt");
        assert_eq!(get_extension(path), Some("txt".to_string()));
    }

    #[test]
    fn test_get_extension_lowercase() {
        let path = std::path::Path::new("/path/to/file.TXT");
        assert_eq!(get_extension(path), Some("txt".to_string()));
    }

    #[test]
    fn test_get_extension_no_extension() {
        let path = std::path::Path::new("/path/to/file");
        assert_eq!(get_extension(path), None);
    }

    #[test]
    fn test_chunk_text_short_input_single_chunk() {
        let chunks = chunk_text("short text", 100, 10);
        assert_eq!(chunks, vec!["short text".to_string()]);
    }

    #[test]
    fn test_chunk_text_empty_input() {
        assert!(chunk_text("", 100, 10).is_empty());
        assert!(chunk_text("   \n\t  ", 100, 10).is_empty());
    }

    #[test]
    fn test_chunk_text_splits_on_whitespace() {
        let text = "alpha beta gamma delta epsilon zeta eta theta";
        let chunks = chunk_text(text, 20, 5);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 20);
            // No chunk starts or ends mid-trim
            assert_eq!(chunk, &chunk.trim().to_string());
        }
    }

    #[test]
    fn test_chunk_text_overlap_repeats_content() {
        let text = "one two three four five six seven eight nine ten";
        let chunks = chunk_text(text, 20, 10);

        assert!(chunks.len() > 1);
        // Some word from the end of chunk N appears again in chunk N+1
        let last_word = chunks[0].split_whitespace().last().unwrap();
        assert!(chunks[1].contains(last_word));
    }

    #[test]
    fn test_chunk_text_unbroken_run_still_chunks() {
        let text = "x".repeat(500);
        let chunks = chunk_text(&text, 100, 10);

        assert!(chunks.len() >= 5);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 100);
        }
    }

    #[test]
    fn test_chunk_text_multibyte_boundaries() {
        let text = "héllo wörld ".repeat(50);
        let chunks = chunk_text(&text, 40, 8);

        // Reassembly must not have lost any non-overlap content
        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 40);
        }
    }
}
