//! Dictionary-form lemmatization for complaint narratives
//!
//! Tokens are split on Unicode word boundaries. Only purely alphabetic
//! tokens that are not stop words survive; each is replaced by its
//! lower-cased lemma. Lemmas come from an irregular-form table first, then
//! from English inflection rules (plural `-s/-es/-ies`, past `-ed/-ied`,
//! progressive `-ing`) with consonant un-doubling and silent-e restoration.
//!
//! Output is a pure function of the input text.

use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};
use unicode_segmentation::UnicodeSegmentation;

/// English stop words (matched against the lower-cased token)
const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "across", "after", "afterwards", "again", "against", "all",
    "almost", "alone", "along", "already", "also", "although", "always", "am", "among",
    "amongst", "amount", "an", "and", "another", "any", "anyhow", "anyone", "anything",
    "anyway", "anywhere", "are", "around", "as", "at", "back", "be", "became", "because",
    "become", "becomes", "becoming", "been", "before", "beforehand", "behind", "being",
    "below", "beside", "besides", "between", "beyond", "both", "bottom", "but", "by",
    "ca", "call", "can", "cannot", "could", "did", "do", "does", "doing", "done", "down",
    "due", "during", "each", "eight", "either", "eleven", "else", "elsewhere", "empty",
    "enough", "even", "ever", "every", "everyone", "everything", "everywhere", "except",
    "few", "fifteen", "fifty", "first", "five", "for", "former", "formerly", "forty",
    "four", "from", "front", "full", "further", "get", "give", "go", "had", "has", "have",
    "he", "hence", "her", "here", "hereafter", "hereby", "herein", "hereupon", "hers",
    "herself", "him", "himself", "his", "how", "however", "hundred", "i", "if", "in",
    "indeed", "into", "is", "it", "its", "itself", "just", "keep", "last", "latter",
    "latterly", "least", "less", "made", "make", "many", "may", "me", "meanwhile",
    "might", "mine", "more", "moreover", "most", "mostly", "move", "much", "must", "my",
    "myself", "name", "namely", "neither", "never", "nevertheless", "next", "nine", "no",
    "nobody", "none", "noone", "nor", "not", "nothing", "now", "nowhere", "of", "off",
    "often", "on", "once", "one", "only", "onto", "or", "other", "others", "otherwise",
    "our", "ours", "ourselves", "out", "over", "own", "part", "per", "perhaps", "please",
    "put", "quite", "rather", "re", "really", "regarding", "same", "say", "see", "seem",
    "seemed", "seeming", "seems", "serious", "several", "she", "should", "show", "side",
    "since", "six", "sixty", "so", "some", "somehow", "someone", "something", "sometime",
    "sometimes", "somewhere", "still", "such", "take", "ten", "than", "that", "the",
    "their", "them", "themselves", "then", "thence", "there", "thereafter", "thereby",
    "therefore", "therein", "thereupon", "these", "they", "third", "this", "those",
    "though", "three", "through", "throughout", "thru", "thus", "to", "together", "too",
    "top", "toward", "towards", "twelve", "twenty", "two", "under", "unless", "until",
    "up", "upon", "us", "used", "using", "various", "very", "via", "was", "we", "well",
    "were", "what", "whatever", "when", "whence", "whenever", "where", "whereafter",
    "whereas", "whereby", "wherein", "whereupon", "wherever", "whether", "which", "while",
    "whither", "who", "whoever", "whole", "whom", "whose", "why", "will", "with",
    "within", "without", "would", "yet", "you", "your", "yours", "yourself", "yourselves",
];

/// Inflected forms whose lemma the suffix rules cannot derive
const IRREGULAR: &[(&str, &str)] = &[
    ("is", "be"), ("am", "be"), ("are", "be"), ("was", "be"), ("were", "be"),
    ("been", "be"), ("being", "be"), ("has", "have"), ("had", "have"), ("having", "have"),
    ("did", "do"), ("does", "do"), ("done", "do"), ("goes", "go"), ("went", "go"),
    ("gone", "go"), ("paid", "pay"), ("overpaid", "overpay"), ("prepaid", "prepay"),
    ("repaid", "repay"), ("said", "say"), ("made", "make"), ("making", "make"),
    ("got", "get"), ("gotten", "get"), ("took", "take"), ("taken", "take"),
    ("taking", "take"), ("gave", "give"), ("given", "give"), ("told", "tell"),
    ("sent", "send"), ("spent", "spend"), ("bought", "buy"), ("brought", "bring"),
    ("thought", "think"), ("found", "find"), ("kept", "keep"), ("left", "leave"),
    ("lost", "lose"), ("felt", "feel"), ("held", "hold"), ("meant", "mean"),
    ("heard", "hear"), ("knew", "know"), ("known", "know"), ("saw", "see"),
    ("seen", "see"), ("came", "come"), ("coming", "come"), ("began", "begin"),
    ("begun", "begin"), ("wrote", "write"), ("written", "write"), ("spoke", "speak"),
    ("spoken", "speak"), ("stole", "steal"), ("stolen", "steal"), ("chose", "choose"),
    ("chosen", "choose"), ("froze", "freeze"), ("frozen", "freeze"), ("led", "lead"),
    ("lent", "lend"), ("ran", "run"), ("won", "win"), ("sold", "sell"),
    ("stood", "stand"), ("understood", "understand"), ("withdrew", "withdraw"),
    ("withdrawn", "withdraw"), ("drew", "draw"), ("drawn", "draw"), ("fell", "fall"),
    ("fallen", "fall"), ("forgot", "forget"), ("forgotten", "forget"), ("hid", "hide"),
    ("hidden", "hide"), ("built", "build"), ("dealt", "deal"), ("sought", "seek"),
    ("taught", "teach"), ("caught", "catch"), ("broke", "break"), ("broken", "break"),
    ("drove", "drive"), ("driven", "drive"), ("rose", "rise"), ("risen", "rise"),
    ("shown", "show"), ("became", "become"), ("overdrew", "overdraw"),
    ("overdrawn", "overdraw"), ("misled", "mislead"), ("added", "add"), ("adding", "add"),
    ("created", "create"), ("creating", "create"), ("agreed", "agree"),
    ("disagreed", "disagree"), ("freed", "free"), ("guaranteed", "guarantee"),
    ("children", "child"), ("men", "man"), ("women", "woman"), ("feet", "foot"),
    ("teeth", "tooth"), ("thieves", "thief"), ("wives", "wife"), ("knives", "knife"),
    ("halves", "half"), ("shelves", "shelf"), ("better", "good"), ("best", "good"),
    ("worse", "bad"), ("worst", "bad"), ("wo", "will"), ("sha", "shall"),
];

/// Words that look inflected but are already base forms
const INVARIANT: &[&str] = &[
    "news", "series", "species", "alias", "atlas", "canvas", "bias", "texas", "kansas",
    "arkansas", "massachusetts", "christmas", "morning", "evening", "ceiling", "wedding",
    "clothing", "outstanding", "need", "speed", "proceed", "exceed", "succeed", "feed",
];

static STOP_SET: Lazy<HashSet<&'static str>> = Lazy::new(|| STOP_WORDS.iter().copied().collect());

static IRREGULAR_MAP: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| IRREGULAR.iter().copied().collect());

static INVARIANT_SET: Lazy<HashSet<&'static str>> =
    Lazy::new(|| INVARIANT.iter().copied().collect());

/// Rule-based English lemmatizer
#[derive(Debug, Clone, Copy, Default)]
pub struct Lemmatizer;

impl Lemmatizer {
    pub fn new() -> Self {
        Self
    }

    /// Lemmatize a cleaned narrative into a space-joined token string
    ///
    /// Returns the empty string when no token survives.
    pub fn lemmatize(&self, text: &str) -> String {
        let mut lemmas: Vec<String> = Vec::new();
        for word in text.unicode_words() {
            let Some(token) = strip_contraction(word) else {
                continue;
            };
            if !is_alpha(token) {
                continue;
            }
            let lower = token.to_lowercase();
            if is_stop_word(&lower) {
                continue;
            }
            lemmas.push(lemma(&lower));
        }
        lemmas.join(" ")
    }
}

/// Check stop-word membership of a lower-cased token
pub fn is_stop_word(lower: &str) -> bool {
    STOP_SET.contains(lower)
}

fn is_alpha(token: &str) -> bool {
    !token.is_empty() && token.chars().all(char::is_alphabetic)
}

/// Keep the stem of an apostrophe contraction (`customer's` → `customer`,
/// `don't` → `do`); the clitic itself is never alphabetic and is dropped.
fn strip_contraction(word: &str) -> Option<&str> {
    let Some(pos) = word.find(['\'', '\u{2019}']) else {
        return Some(word);
    };
    let head = &word[..pos];
    let tail = &word[pos..];
    let tail = tail.trim_start_matches(['\'', '\u{2019}']);
    if tail.eq_ignore_ascii_case("t") && head.len() > 1 && head.ends_with(['n', 'N']) {
        return Some(&head[..head.len() - 1]);
    }
    if head.is_empty() {
        None
    } else {
        Some(head)
    }
}

/// Lemma of a single lower-cased alphabetic token
pub fn lemma(word: &str) -> String {
    if let Some(base) = IRREGULAR_MAP.get(word) {
        return (*base).to_string();
    }
    if INVARIANT_SET.contains(word) || word.chars().count() <= 3 || !word.is_ascii() {
        return word.to_string();
    }

    if let Some(stem) = word.strip_suffix("ies") {
        return if stem.len() >= 2 {
            format!("{stem}y")
        } else {
            format!("{stem}ie")
        };
    }
    if let Some(stem) = word.strip_suffix("ied") {
        return if stem.len() >= 2 {
            format!("{stem}y")
        } else {
            format!("{stem}ie")
        };
    }
    if word.ends_with("eed") {
        return word.to_string();
    }
    if let Some(stem) = word.strip_suffix("ing") {
        if stem.len() >= 3 && has_vowel(stem) {
            return restore_verb_stem(stem);
        }
        return word.to_string();
    }
    if let Some(stem) = word.strip_suffix("ed") {
        if stem.len() >= 2 && has_vowel(stem) {
            return restore_verb_stem(stem);
        }
        return word.to_string();
    }
    if word.ends_with('s') {
        return strip_plural(word);
    }
    word.to_string()
}

fn strip_plural(word: &str) -> String {
    if word.ends_with("ss") || word.ends_with("us") || word.ends_with("is") {
        return word.to_string();
    }
    for suffix in ["sses", "xes", "ches", "shes", "zzes"] {
        if word.ends_with(suffix) {
            return word[..word.len() - 2].to_string();
        }
    }
    word[..word.len() - 1].to_string()
}

fn is_vowel(c: u8) -> bool {
    matches!(c, b'a' | b'e' | b'i' | b'o' | b'u')
}

fn has_vowel(stem: &str) -> bool {
    stem.bytes().any(|c| is_vowel(c) || c == b'y')
}

/// Porter measure: number of vowel-consonant sequences
fn measure(stem: &[u8]) -> usize {
    let mut m = 0;
    let mut prev_vowel = false;
    for &c in stem {
        let vowel = is_vowel(c);
        if prev_vowel && !vowel {
            m += 1;
        }
        prev_vowel = vowel;
    }
    m
}

/// Undo consonant doubling, or restore a dropped silent `e`
fn restore_verb_stem(stem: &str) -> String {
    let b = stem.as_bytes();
    let n = b.len();
    let last = b[n - 1];
    let prev = b[n - 2];

    // stopp → stop, transferr → transfer (bill, miss, buzz, staff keep theirs)
    if last == prev && !is_vowel(last) && !matches!(last, b'l' | b's' | b'z' | b'f') {
        return stem[..n - 1].to_string();
    }

    if needs_silent_e(b) {
        format!("{stem}e")
    } else {
        stem.to_string()
    }
}

fn needs_silent_e(b: &[u8]) -> bool {
    let n = b.len();
    let last = b[n - 1];
    let prev = b[n - 2];
    let before = if n >= 3 { Some(b[n - 3]) } else { None };
    let before_is_consonant = before.is_some_and(|c| !is_vowel(c));

    match last {
        // issu, continu, receiv, authoriz, forc, servic
        b'u' | b'v' | b'z' | b'c' => return true,
        // charg, lodg, indulg, manag, oblig, chang
        b'g' => {
            return matches!(prev, b'r' | b'd' | b'l' | b'a' | b'i' | b'u')
                || (prev == b'n' && before.is_some_and(|c| c == b'a' || c == b'e'))
        }
        b's' => {
            // clos, refus, increas; revers, dispens, laps, puls
            return is_vowel(prev) || matches!(prev, b'r' | b'n' | b'p' | b'l');
        }
        // enabl, handl, settl
        b'l' if matches!(prev, b'b' | b'c' | b'd' | b'f' | b'g' | b'k' | b'p' | b't' | b'z') => {
            return true
        }
        _ => {}
    }

    if before_is_consonant {
        match (prev, last) {
            // disput, execut; provid, decid; includ; declar, compar;
            // requir, acquir; secur, insur; trad, upgrad; declin, combin
            (b'u', b't')
            | (b'i', b'd')
            | (b'u', b'd')
            | (b'a', b'r')
            | (b'i', b'r')
            | (b'u', b'r')
            | (b'a', b'd')
            | (b'i', b'n') => return true,
            // validat, negotiat, evaluat (not treat, float)
            (b'a', b't') => return true,
            // invok, revok; assum, consum
            (v, b'k') | (v, b'm') if is_vowel(v) => return true,
            _ => {}
        }
    } else if prev == b'a' && last == b't' && before.is_some_and(|c| c == b'i' || c == b'u') {
        return true;
    }

    // Short consonant-vowel-consonant stems: stat, not, fin, phon, stor
    measure(b) == 1
        && before_is_consonant
        && is_vowel(prev)
        && !is_vowel(last)
        && !matches!(last, b'w' | b'x' | b'y')
}
