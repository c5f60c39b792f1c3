use proptest::prelude::*;
use rag_store::RecursiveSplitter;

/// Concatenates spans, skipping the bytes each one shares with the previous.
fn reconstruct(text: &str, spans: &[std::ops::Range<usize>]) -> String {
    let mut out = String::new();
    let mut covered = 0;
    for s in spans {
        assert!(s.start <= covered, "gap before {s:?} (covered {covered})");
        assert!(s.end > covered, "span {s:?} adds nothing");
        out.push_str(&text[covered..s.end]);
        covered = s.end;
    }
    out
}

fn size_and_overlap() -> impl Strategy<Value = (usize, usize)> {
    (1usize..80).prop_flat_map(|size| (Just(size), 0..size))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn chunks_reconstruct_the_text(
        text in "[a-zé .\n]{0,600}",
        (size, overlap) in size_and_overlap(),
    ) {
        let splitter = RecursiveSplitter::new(size, overlap).unwrap();
        let spans = splitter.spans(&text);
        prop_assert_eq!(reconstruct(&text, &spans), text.clone());
        if !text.is_empty() {
            prop_assert_eq!(spans.first().map(|s| s.start), Some(0));
            prop_assert_eq!(spans.last().map(|s| s.end), Some(text.len()));
        }
    }

    #[test]
    fn chunks_respect_size_and_overlap(
        text in "[a-z \n]{0,600}",
        (size, overlap) in size_and_overlap(),
    ) {
        let splitter = RecursiveSplitter::new(size, overlap).unwrap();
        let spans = splitter.spans(&text);
        for s in &spans {
            prop_assert!(text[s.clone()].chars().count() <= size);
        }
        for pair in spans.windows(2) {
            let shared = pair[0].end.saturating_sub(pair[1].start);
            let shared_chars = text[pair[1].start..pair[1].start + shared].chars().count();
            prop_assert!(shared_chars <= overlap, "overlap {} > {}", shared_chars, overlap);
        }
    }

    #[test]
    fn splitting_is_deterministic(text in "[a-z .\n]{0,300}") {
        let splitter = RecursiveSplitter::new(50, 10).unwrap();
        prop_assert_eq!(splitter.split_text(&text), splitter.split_text(&text));
    }
}

#[test]
fn default_sizes_on_prose() {
    let para = "Rust is a systems programming language. ".repeat(30);
    let text = format!("{para}\n\n{para}\n\n{para}");
    let splitter = RecursiveSplitter::new(1000, 200).unwrap();
    let chunks = splitter.split_text(&text);
    assert!(chunks.len() >= 4);
    assert!(chunks.iter().all(|c| c.chars().count() <= 1000));
}
