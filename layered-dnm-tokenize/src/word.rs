use layered_dnm::DnmStr;

/// Characters that always form a word of their own.
pub const PUNCTUATION: &[char] = &[
    '.', ',', ':', ';', '!', '?', '(', ')', '[', ']', '{', '}', '-', '”', '“',
];

/// Split on whitespace, emitting each punctuation character as its own word.
pub fn word_tokenize<'a>(sentence: &DnmStr<'a>) -> Vec<DnmStr<'a>> {
    let mut words = Vec::new();
    let mut start = 0;
    for (i, c) in sentence.as_str().chars().enumerate() {
        if c.is_whitespace() {
            if start != i {
                words.push(sentence.slice(start..i));
            }
            start = i + 1;
        } else if PUNCTUATION.contains(&c) {
            if start != i {
                words.push(sentence.slice(start..i));
            }
            words.push(sentence.slice(i..=i));
            start = i + 1;
        }
    }
    if start < sentence.len() {
        words.push(sentence.slice(start..));
    }
    words
}

#[cfg(test)]
mod tests {
    use super::*;
    use layered_dnm::{Dnm, ProjectionPolicy, Tree};

    fn words(markup: &str) -> Vec<String> {
        let dnm = Dnm::new(Tree::parse(markup).unwrap(), &ProjectionPolicy::empty());
        let full = dnm.full_dnm_str().unwrap();
        word_tokenize(&full).iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_words_and_punctuation() {
        assert_eq!(
            words("<p>The  (fast) car-wash, “really”: 3.5 km!</p>"),
            vec![
                "The", "(", "fast", ")", "car", "-", "wash", ",", "“", "really", "”", ":", "3",
                ".", "5", "km", "!"
            ]
        );
    }

    #[test]
    fn test_words_across_elements() {
        let dnm = Dnm::new(
            Tree::parse("<p>hel<b>lo</b> world</p>").unwrap(),
            &ProjectionPolicy::empty(),
        );
        let full = dnm.full_dnm_str().unwrap();
        let found = word_tokenize(&full);

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].as_str(), "hello");
        assert_eq!(found[0].backrefs(), &[0, 1, 2, 3, 4]);
        assert_eq!(found[1].backrefs(), &[6, 7, 8, 9, 10]);
    }

    #[test]
    fn test_no_words() {
        assert!(words("<p> \t </p>").is_empty());
        assert_eq!(words("<p>?</p>"), vec!["?"]);
    }
}
