// src/feedback/synthesizer.rs
use crate::analysis::{lexicon, AnalysisReport};
use crate::config::{AnalysisCfg, FeedbackCfg};
use crate::core::{CompetencyScore, FindingCategory, Highlight, NUM_COMPETENCIES};

/// Qualitative tier of one score relative to its configured band cutoffs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Band {
    Excellent,
    VeryGood,
    Good,
    Fair,
    Insufficient,
}

impl Band {
    pub fn label(&self) -> &'static str {
        match self {
            Band::Excellent => "Excelente",
            Band::VeryGood => "Muito Bom",
            Band::Good => "Bom",
            Band::Fair => "Regular",
            Band::Insufficient => "Insuficiente",
        }
    }

    fn classify(value: f32, cutoffs: &[f32; 4]) -> Band {
        if value >= cutoffs[0] {
            Band::Excellent
        } else if value >= cutoffs[1] {
            Band::VeryGood
        } else if value >= cutoffs[2] {
            Band::Good
        } else if value >= cutoffs[3] {
            Band::Fair
        } else {
            Band::Insufficient
        }
    }
}

/// Turns numeric, structural and error signals into per-competency and
/// overall narratives. Pure: no IO, deterministic for fixed inputs.
pub struct FeedbackSynthesizer {
    cfg: FeedbackCfg,
    analysis_cfg: AnalysisCfg,
}

impl FeedbackSynthesizer {
    pub fn new(cfg: FeedbackCfg, analysis_cfg: AnalysisCfg) -> Self {
        Self { cfg, analysis_cfg }
    }

    pub fn competency_feedback(
        &self,
        index: u8,
        value: f32,
        text: &str,
        report: &AnalysisReport,
    ) -> CompetencyScore {
        debug_assert!((1..=NUM_COMPETENCIES as u8).contains(&index));
        let band = Band::classify(value, &self.cfg.competency_bands[(index - 1) as usize]);
        match index {
            1 => self.norm_mastery(value, band, report),
            2 => self.topic_development(value, band, report),
            3 => self.information_organization(value, band, report),
            4 => self.cohesion_mechanisms(value, band, report),
            _ => self.intervention_proposal(value, band, text),
        }
    }

    /// Competency 1: command of the formal written norm. Driven mostly by
    /// the grammar findings from the rule path.
    fn norm_mastery(&self, value: f32, band: Band, report: &AnalysisReport) -> CompetencyScore {
        let errors = report.findings.len();

        let narrative = match band {
            Band::Excellent => "Demonstra pleno domínio da norma culta da língua portuguesa.",
            Band::VeryGood => "Demonstra bom domínio da norma culta, com poucos desvios gramaticais.",
            Band::Good => "Demonstra domínio adequado da norma culta, mas com alguns desvios.",
            Band::Fair => "Demonstra domínio mediano da norma culta, com vários desvios.",
            Band::Insufficient => {
                "Apresenta muitos desvios gramaticais que prejudicam a compreensão."
            }
        };

        let mut strengths = Vec::new();
        if errors < 3 {
            strengths.push("Poucos erros gramaticais identificados".to_string());
        }
        if band <= Band::VeryGood {
            strengths.push("Boa estruturação de períodos".to_string());
            strengths.push("Uso adequado da pontuação".to_string());
        }

        let mut improvements = Vec::new();
        if errors > 5 {
            improvements.push(format!("Foram identificados {errors} erros gramaticais"));
        }
        if report.orthography_errors > 0 {
            improvements.push(format!(
                "Atenção a {} erros de ortografia",
                report.orthography_errors
            ));
        }
        if report.grammar_errors > 0 {
            improvements.push(format!(
                "Revisar {} desvios gramaticais",
                report.grammar_errors
            ));
        }

        let highlights = report
            .findings
            .iter()
            .take(self.cfg.max_highlighted_findings)
            .map(|f| Highlight {
                excerpt: f.excerpt.clone(),
                kind: "erro".to_string(),
                note: format!(
                    "{}: {}",
                    match f.category {
                        FindingCategory::Orthography => "Ortografia",
                        FindingCategory::Grammar => "Gramática",
                    },
                    f.message
                ),
            })
            .collect();

        CompetencyScore {
            index: 1,
            value,
            feedback: format!(
                "{} - {} Foram identificados {errors} desvios gramaticais/ortográficos.",
                band.label(),
                narrative
            ),
            strengths,
            improvements,
            highlights,
        }
    }

    /// Competency 2: understanding of the prompt and applied repertoire.
    fn topic_development(&self, value: f32, band: Band, report: &AnalysisReport) -> CompetencyScore {
        let narrative = match band {
            Band::Excellent => {
                "Desenvolve muito bem o tema com argumentação consistente e repertório sociocultural produtivo."
            }
            Band::VeryGood => "Desenvolve bem o tema com boa argumentação e repertório adequado.",
            Band::Good => "Desenvolve o tema de forma adequada, com argumentação suficiente.",
            Band::Fair => "Desenvolve o tema de forma mediana, argumentação pode ser aprimorada.",
            Band::Insufficient => "Apresenta desenvolvimento superficial do tema.",
        };

        let mut strengths = Vec::new();
        if report.structure.has_intro {
            strengths.push("Boa apresentação do tema na introdução".to_string());
        }
        if band <= Band::VeryGood {
            strengths.push("Argumentação consistente".to_string());
        }

        let mut improvements = Vec::new();
        if !report.structure.has_intro {
            improvements
                .push("Desenvolver melhor a introdução contextualizando o tema".to_string());
        }
        if band > Band::VeryGood {
            improvements
                .push("Aprofundar a argumentação com mais repertório sociocultural".to_string());
        }

        CompetencyScore {
            index: 2,
            value,
            feedback: format!("{} - {}", band.label(), narrative),
            strengths,
            improvements,
            highlights: Vec::new(),
        }
    }

    /// Competency 3: selection and organization of information.
    fn information_organization(
        &self,
        value: f32,
        band: Band,
        report: &AnalysisReport,
    ) -> CompetencyScore {
        let narrative = match band {
            Band::Excellent => {
                "Apresenta informações muito bem selecionadas, relacionadas e organizadas em defesa do ponto de vista."
            }
            Band::VeryGood => {
                "Apresenta informações bem selecionadas e organizadas em defesa do ponto de vista."
            }
            Band::Good => "Apresenta informações adequadamente selecionadas e organizadas.",
            _ => "A seleção e organização de informações pode ser aprimorada.",
        };

        let mut strengths = Vec::new();
        if report.structure.has_development {
            strengths.push("Boa organização do desenvolvimento".to_string());
        }
        if report.structure.paragraph_count >= 4 {
            strengths.push("Estrutura bem dividida em parágrafos".to_string());
        }

        let mut improvements = Vec::new();
        if report.structure.paragraph_count < 3 {
            improvements
                .push("Desenvolver mais parágrafos para melhor organizar as ideias".to_string());
        }
        if band > Band::VeryGood {
            improvements
                .push("Melhorar a relação entre as informações apresentadas".to_string());
        }

        CompetencyScore {
            index: 3,
            value,
            feedback: format!("{} - {}", band.label(), narrative),
            strengths,
            improvements,
            highlights: Vec::new(),
        }
    }

    /// Competency 4: cohesion mechanisms, driven by connective usage.
    fn cohesion_mechanisms(
        &self,
        value: f32,
        band: Band,
        report: &AnalysisReport,
    ) -> CompetencyScore {
        use crate::core::ConnectiveUsage;

        let usage = report.structure.connective_usage;

        let narrative = match band {
            Band::Excellent => {
                "Articula muito bem as partes do texto com uso diversificado de conectivos."
            }
            Band::VeryGood => "Articula bem as partes do texto com uso adequado de conectivos.",
            Band::Good => "Articula as partes do texto com uso suficiente de recursos coesivos.",
            _ => "A articulação entre as partes do texto pode ser melhorada.",
        };

        let mut strengths = Vec::new();
        if usage >= ConnectiveUsage::Adequate {
            strengths.push(format!("Uso {} de conectivos", usage.as_str()));
        }
        if report.structure.cohesion >= 0.7 {
            strengths.push("Boa coesão textual".to_string());
        }

        let mut improvements = Vec::new();
        if usage < ConnectiveUsage::Adequate {
            improvements
                .push("Utilizar mais conectivos para articular melhor as ideias".to_string());
        }
        if report.structure.cohesion < 0.6 {
            improvements.push("Evitar repetições excessivas de palavras".to_string());
        }

        CompetencyScore {
            index: 4,
            value,
            feedback: format!("{} - {}", band.label(), narrative),
            strengths,
            improvements,
            highlights: Vec::new(),
        }
    }

    /// Competency 5: intervention proposal. Scans the text for the
    /// agent/action/means triad and reports which parts are missing.
    fn intervention_proposal(&self, value: f32, band: Band, text: &str) -> CompetencyScore {
        let lower = text.to_lowercase();
        let has_agent = lexicon::contains_any(&lower, &self.analysis_cfg.agent_terms);
        let has_action = lexicon::contains_any(&lower, &self.analysis_cfg.action_terms);
        let has_means = lexicon::contains_any(&lower, &self.analysis_cfg.means_terms);

        let narrative = match band {
            Band::Excellent => {
                "Elabora muito bem proposta de intervenção completa, detalhada e articulada à discussão."
            }
            Band::VeryGood => {
                "Elabora bem proposta de intervenção relacionada ao tema e articulada à discussão."
            }
            Band::Good => "Elabora proposta de intervenção relacionada ao tema.",
            _ => "Proposta de intervenção pode ser mais detalhada e completa.",
        };

        let mut strengths = Vec::new();
        if has_agent {
            strengths.push("Identifica agente(s) responsável(is) pela ação".to_string());
        }
        if has_action {
            strengths.push("Apresenta ação(ões) a serem realizadas".to_string());
        }
        if has_means {
            strengths.push("Detalha meio(s) de execução".to_string());
        }

        let mut improvements = Vec::new();
        if !has_agent {
            improvements.push("Especificar quem deve executar a proposta".to_string());
        }
        if !has_action {
            improvements.push("Detalhar as ações concretas a serem tomadas".to_string());
        }
        if !has_means {
            improvements.push("Explicar como a proposta será executada".to_string());
        }
        if band > Band::VeryGood {
            improvements.push(
                "Melhorar a articulação da proposta com a discussão desenvolvida".to_string(),
            );
        }

        CompetencyScore {
            index: 5,
            value,
            feedback: format!("{} - {}", band.label(), narrative),
            strengths,
            improvements,
            highlights: Vec::new(),
        }
    }

    /// Overall narrative: aggregate band, best and worst competency, and
    /// a human-review recommendation whenever confidence falls below the
    /// low threshold.
    pub fn overall_feedback(
        &self,
        aggregate: f32,
        competencies: &[CompetencyScore],
        confidence: f32,
        low_threshold: f32,
    ) -> String {
        let band = self.aggregate_band(aggregate);

        let best = competencies
            .iter()
            .max_by(|a, b| a.value.partial_cmp(&b.value).unwrap_or(std::cmp::Ordering::Equal));
        let worst = competencies
            .iter()
            .min_by(|a, b| a.value.partial_cmp(&b.value).unwrap_or(std::cmp::Ordering::Equal));

        let mut feedback = format!(
            "Sua redação obteve nota {}/1000 (nível {}). ",
            aggregate.round() as i64,
            band.label()
        );
        if let (Some(best), Some(worst)) = (best, worst) {
            feedback.push_str(&format!(
                "Seu melhor desempenho foi na Competência {} ({}/200). \
                 A Competência {} ({}/200) pode ser aprimorada. ",
                best.index,
                best.value.round() as i64,
                worst.index,
                worst.value.round() as i64,
            ));
        }

        if confidence < low_threshold {
            feedback.push_str("Recomenda-se validação da correção por um professor.");
        }

        feedback.trim_end().to_string()
    }

    /// One-line evaluation summary.
    pub fn summary(&self, aggregate: f32) -> String {
        let band = self.aggregate_band(aggregate);
        let label = match band {
            Band::Insufficient => "Precisa Melhorar".to_string(),
            other => format!("Nível {}", other.label()),
        };
        format!("Nota {}/1000 - {}", aggregate.round() as i64, label)
    }

    fn aggregate_band(&self, aggregate: f32) -> Band {
        Band::classify(aggregate, &self.cfg.aggregate_bands)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ConnectiveUsage, StructuralProfile};

    fn report(paragraphs: usize, usage: ConnectiveUsage) -> AnalysisReport {
        AnalysisReport {
            findings: Vec::new(),
            orthography_errors: 0,
            grammar_errors: 0,
            structure: StructuralProfile {
                has_intro: true,
                has_development: paragraphs >= 3,
                has_conclusion: true,
                paragraph_count: paragraphs,
                connective_usage: usage,
                cohesion: 0.8,
                coherence: 0.7,
            },
            degraded: false,
        }
    }

    fn synthesizer() -> FeedbackSynthesizer {
        FeedbackSynthesizer::new(FeedbackCfg::default(), AnalysisCfg::default())
    }

    #[test]
    fn band_cutoffs_are_inclusive() {
        let cutoffs = [180.0, 160.0, 140.0, 120.0];
        assert_eq!(Band::classify(180.0, &cutoffs), Band::Excellent);
        assert_eq!(Band::classify(179.9, &cutoffs), Band::VeryGood);
        assert_eq!(Band::classify(120.0, &cutoffs), Band::Fair);
        assert_eq!(Band::classify(119.9, &cutoffs), Band::Insufficient);
    }

    #[test]
    fn intervention_triad_reports_missing_parts() {
        let s = synthesizer();
        // Agent and action present, means missing.
        let text = "O governo deve criar programas educacionais.";
        let comp = s.competency_feedback(5, 150.0, text, &report(4, ConnectiveUsage::Adequate));
        assert!(comp.strengths.iter().any(|p| p.contains("agente")));
        assert!(comp
            .improvements
            .iter()
            .any(|p| p.contains("como a proposta")));
    }

    #[test]
    fn low_confidence_appends_review_sentence() {
        let s = synthesizer();
        let comps: Vec<CompetencyScore> = (1..=5)
            .map(|i| CompetencyScore {
                index: i,
                value: 120.0 + i as f32 * 10.0,
                feedback: String::new(),
                strengths: Vec::new(),
                improvements: Vec::new(),
                highlights: Vec::new(),
            })
            .collect();

        let confident = s.overall_feedback(700.0, &comps, 0.9, 0.70);
        assert!(!confident.contains("professor"));

        let doubtful = s.overall_feedback(700.0, &comps, 0.6, 0.70);
        assert!(doubtful.contains("Recomenda-se validação da correção por um professor"));
        assert!(doubtful.contains("Competência 5"));
        assert!(doubtful.contains("Competência 1"));
    }

    #[test]
    fn summary_classifies_aggregate_band() {
        let s = synthesizer();
        assert_eq!(s.summary(920.0), "Nota 920/1000 - Nível Excelente");
        assert_eq!(s.summary(550.0), "Nota 550/1000 - Precisa Melhorar");
    }
}
