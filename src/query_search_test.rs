// Query engine tests
// Keyword scoring, link lookups, traversal, relatedness, orphans and block lookup

#[cfg(test)]
mod tests {
    use std::fs;
    use tempfile::TempDir;

    use crate::graph::{build_index, scanner, GraphIndex};
    use crate::query::{score_block_relevance, ConnectionType, RelatedOptions, SearchOptions, TraversalHop};

    fn graph(files: &[(&str, &str)]) -> (TempDir, GraphIndex) {
        let temp_dir = TempDir::new().unwrap();
        for (rel, content) in files {
            let path = temp_dir.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        let files = scanner::list_markdown_files(temp_dir.path());
        let index = build_index(&files, temp_dir.path());
        (temp_dir, index)
    }

    fn hops(found: &[TraversalHop]) -> Vec<(&str, usize)> {
        found.iter().map(|h| (h.page_name.as_str(), h.hop)).collect()
    }

    #[test]
    fn test_score_block_relevance_counts_occurrences() {
        assert_eq!(score_block_relevance("test test programming", "test programming"), 3);
        assert_eq!(score_block_relevance("unrelated", "test programming"), 0);
        // Short words are ignored
        assert_eq!(score_block_relevance("an ox and an ox", "an ox"), 0);
        assert_eq!(score_block_relevance("Rust RUST rust", "rust"), 3);
    }

    #[test]
    fn test_search_weights() {
        let (_dir, index) = graph(&[
            ("pages/Rust.md", "- Learning rust today #rust-lang"),
            ("pages/Notes.md", "- nothing relevant here"),
        ]);

        let results = index.search_graph("rust", &SearchOptions::default());
        assert_eq!(results.len(), 1);
        let hit = &results[0];
        assert_eq!(hit.page_name, "Rust");
        // word hit 1 + block 2 + page name 3 + tag 1
        assert_eq!(hit.score, 7);
        assert_eq!(hit.excerpt, "Learning rust today #rust-lang");
        assert_eq!(hit.blocks.len(), 1);
    }

    #[test]
    fn test_search_ignores_short_query_words() {
        let (_dir, index) = graph(&[("pages/Ox.md", "- an ox")]);
        assert!(index.search_graph("ox an", &SearchOptions::default()).is_empty());
    }

    #[test]
    fn test_search_respects_limit_and_threshold() {
        let files: Vec<(String, String)> = (0..15)
            .map(|i| {
                let body = "- garden work\n".repeat(i % 4 + 1);
                (format!("pages/Page{:02}.md", i), body)
            })
            .collect();
        let borrowed: Vec<(&str, &str)> = files.iter().map(|(p, c)| (p.as_str(), c.as_str())).collect();
        let (_dir, index) = graph(&borrowed);

        let options = SearchOptions {
            relevance_threshold: 5,
            limit: 4,
        };
        let results = index.search_graph("garden", &options);
        assert!(results.len() <= 4);
        assert!(results.iter().all(|r| r.score > 5));
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));

        let all = index.search_graph("garden", &SearchOptions::default());
        assert_eq!(all.len(), 10);
    }

    #[test]
    fn test_search_excerpts_are_truncated_and_capped() {
        let long = "x".repeat(300);
        let body: String = (0..8).map(|i| format!("- keyword {} {}\n", i, long)).collect();
        let (_dir, index) = graph(&[("pages/Long.md", body.as_str())]);

        let results = index.search_graph("keyword", &SearchOptions::default());
        let hit = &results[0];
        assert_eq!(hit.blocks.len(), 5);
        assert!(hit.blocks.iter().all(|b| b.content.chars().count() == 200));
        assert_eq!(hit.excerpt.chars().count(), 200);
        // 1 word hit + 8 blocks * 2
        assert_eq!(hit.score, 17);
    }

    #[test]
    fn test_links() {
        let (_dir, index) = graph(&[
            ("pages/Alpha.md", "- Loves [[Beta]]\n- Also [[Gamma]] and [[Beta]]"),
            ("pages/Beta.md", "- Back to [[Alpha]]"),
            ("pages/Gamma.md", ""),
            ("pages/Delta.md", "- Points at [[Alpha]]"),
        ]);

        assert_eq!(index.get_forward_links("Alpha"), vec!["Beta", "Gamma"]);
        assert_eq!(index.get_backlinks("Alpha"), vec!["Beta", "Delta"]);
        assert_eq!(index.get_connected_pages("Alpha"), vec!["Beta", "Delta", "Gamma"]);
        assert!(index.get_backlinks("Unknown").is_empty());
        assert!(index.get_forward_links("Unknown").is_empty());
    }

    #[test]
    fn test_traverse_graph_breadth_first() {
        let (_dir, index) = graph(&[
            ("pages/A.md", "- [[B]]"),
            ("pages/B.md", "- [[C]]"),
            ("pages/C.md", "- [[D]]"),
            ("pages/D.md", ""),
        ]);

        assert_eq!(hops(&index.traverse_graph("A", 2)), vec![("B", 1), ("C", 2)]);
        assert_eq!(hops(&index.traverse_graph("A", 3)), vec![("B", 1), ("C", 2), ("D", 3)]);
        assert_eq!(hops(&index.traverse_graph("C", 1)), vec![("B", 1), ("D", 1)]);
        assert!(index.traverse_graph("A", 0).is_empty());
    }

    #[test]
    fn test_traverse_visits_each_page_once() {
        let (_dir, index) = graph(&[
            ("pages/A.md", "- [[B]] [[C]]"),
            ("pages/B.md", "- [[C]] [[A]]"),
            ("pages/C.md", "- [[A]]"),
        ]);
        let found = index.traverse_graph("A", 5);
        assert_eq!(hops(&found), vec![("B", 1), ("C", 1)]);
    }

    #[test]
    fn test_find_related_pages() {
        let (_dir, index) = graph(&[
            ("pages/A.md", "- Reading [[Hub]] #books\n  status:: active"),
            ("pages/B.md", "- Also [[Hub]] #books\n  status:: active"),
            ("pages/C.md", "- Only [[Hub]]"),
            ("pages/Hub.md", ""),
        ]);

        let related = index.find_related_pages("A", &RelatedOptions::default());
        let names: Vec<&str> = related.iter().map(|r| r.page_name.as_str()).collect();
        assert_eq!(names, vec!["B", "C"]);

        let b = &related[0];
        // 1 shared connection + 2 * 1 shared tag + 1 shared property
        assert_eq!(b.strength, 4);
        assert_eq!(b.hop, 2);
        assert_eq!(
            b.connection_types,
            vec![
                ConnectionType::SharedConnections,
                ConnectionType::SharedTags,
                ConnectionType::SharedProperties
            ]
        );
        assert_eq!(related[1].strength, 1);
        assert_eq!(related[1].connection_types, vec![ConnectionType::SharedConnections]);

        let strict = RelatedOptions {
            max_hops: 2,
            min_connections: 3,
        };
        assert_eq!(index.find_related_pages("A", &strict).len(), 1);
    }

    #[test]
    fn test_find_orphaned_pages() {
        let (_dir, index) = graph(&[
            ("pages/Lonely.md", "- nobody links here"),
            ("pages/Tagged.md", "- alone but #tagged"),
            ("pages/Linked.md", "- see [[Target]]"),
            ("pages/Target.md", "- linked from elsewhere"),
            ("journals/2025_01_01.md", "- quiet day"),
        ]);

        let orphans = index.find_orphaned_pages(false);
        assert_eq!(orphans, vec!["Lonely"]);

        let with_tagged = index.find_orphaned_pages(true);
        assert_eq!(with_tagged, vec!["Lonely", "Tagged"]);
        assert!(with_tagged.iter().all(|name| !name.starts_with("journals/")));
    }

    #[test]
    fn test_get_block_by_id_with_neighbours() {
        let (_dir, index) = graph(&[(
            "pages/Blocks.md",
            "- zero\n- one\n- aaaaaaaaaaaaa two\n  - three\n- four\n- five\n- bbbbbbbbbbbbb six",
        )]);

        let found = index.get_block_by_id("aaaaaaaaaaaaa").unwrap();
        assert_eq!(found.block.content, "two");
        assert_eq!(found.page.name, "Blocks");
        assert_eq!(found.block_index, 2);
        let before: Vec<&str> = found.before.iter().map(|b| b.content.as_str()).collect();
        let after: Vec<&str> = found.after.iter().map(|b| b.content.as_str()).collect();
        assert_eq!(before, vec!["zero", "one"]);
        assert_eq!(after, vec!["three", "four"]);

        let last = index.get_block_by_id("bbbbbbbbbbbbb").unwrap();
        assert_eq!(last.before.len(), 2);
        assert!(last.after.is_empty());

        assert!(index.get_block_by_id("missing").is_none());
    }

    #[test]
    fn test_page_lookup() {
        let (_dir, index) = graph(&[("pages/Alpha.md", "- a"), ("journals/2025_02_01.md", "- j")]);
        assert!(index.get_page("Alpha").is_some());
        assert!(index.get_page("Nope").is_none());
        assert_eq!(index.journal_page_names(), vec!["journals/2025_02_01"]);
        assert_eq!(index.page_names().len(), 2);
    }
}
