// src/analysis/lexicon.rs
//
// Default keyword sets for the rule path. These are data, not code:
// deployments override any of them through `AnalysisCfg`.

fn owned(terms: &[&str]) -> Vec<String> {
    terms.iter().map(|t| t.to_string()).collect()
}

/// Connectives commonly expected in dissertative essays, grouped by
/// function (addition, opposition, conclusion, explanation,
/// exemplification, sequencing).
pub fn default_connectives() -> Vec<String> {
    owned(&[
        "além disso", "ademais", "também", "igualmente", "ainda", "assim como",
        "porém", "contudo", "todavia", "entretanto", "no entanto", "mas",
        "portanto", "logo", "assim", "por conseguinte", "consequentemente",
        "pois", "porque", "uma vez que", "visto que", "já que",
        "por exemplo", "como", "tal como", "isto é", "ou seja",
        "primeiramente", "em seguida", "posteriormente", "finalmente", "por fim",
    ])
}

/// Topic-framing terms that mark a working introduction.
pub fn default_intro_markers() -> Vec<String> {
    owned(&[
        "atualmente", "nos dias de hoje", "é sabido", "é notório",
        "a sociedade", "o brasil", "no contexto", "diante",
        "questão", "tema", "problema", "debate",
    ])
}

/// Closing/intervention terms that mark a working conclusion.
pub fn default_conclusion_markers() -> Vec<String> {
    owned(&[
        "portanto", "logo", "assim", "dessa forma", "desse modo",
        "conclui-se", "concluo", "por fim", "finalmente",
        "medidas", "solução", "proposta", "necessário", "deve-se",
    ])
}

/// Intervention-proposal triad: who acts.
pub fn default_agent_terms() -> Vec<String> {
    owned(&["governo", "estado", "ministério", "sociedade", "escola", "mídia"])
}

/// Intervention-proposal triad: what is done.
pub fn default_action_terms() -> Vec<String> {
    owned(&["deve", "precisa", "necessário", "criar", "implementar", "promover"])
}

/// Intervention-proposal triad: by which means.
pub fn default_means_terms() -> Vec<String> {
    owned(&["através", "por meio", "mediante", "usando"])
}

/// Case-insensitive containment of any term. Callers pass pre-lowercased
/// text; terms are matched as substrings, which is what multi-word
/// connectives need.
pub fn contains_any(text_lower: &str, terms: &[String]) -> bool {
    terms.iter().any(|t| text_lower.contains(t.as_str()))
}

/// Number of distinct terms present in the text.
pub fn count_present(text_lower: &str, terms: &[String]) -> usize {
    terms
        .iter()
        .filter(|t| text_lower.contains(t.as_str()))
        .count()
}
