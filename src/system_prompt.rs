//! Fixed assistant persona and the canned page content

use serde::Serialize;

/// Sent as the system instruction with every request
pub const SYSTEM_INSTRUCTION: &str = "\
Eres un asistente técnico experto en instalaciones fotovoltaicas (energía solar).
Tu objetivo es ayudar a instaladores y usuarios finales con dudas técnicas.
Tus respuestas deben ser precisas, técnicas pero comprensibles, y siempre priorizando la seguridad eléctrica.
Si te preguntan algo que no tenga nada que ver con energía solar o electricidad, responde amablemente que solo puedes responder sobre instalaciones fotovoltaicas.
Usa unidades correctas (W, kW, kWh, V, A).";

pub const PAGE_TITLE: &str = "☀️ Asistente Técnico Fotovoltaico";

pub const WELCOME: &str = "Bienvenido. Soy una IA especializada en resolver dudas sobre \
paneles solares, inversores y baterías.";

pub const INPUT_PLACEHOLDER: &str = "Escribe tu duda técnica aquí...";

/// A question the page offers as a one-click button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExampleQuestion {
    pub label: &'static str,
    pub question: &'static str,
}

pub const EXAMPLE_QUESTIONS: [ExampleQuestion; 3] = [
    ExampleQuestion {
        label: "Calculo de Baterías",
        question: "¿Cómo calculo la capacidad de batería necesaria para una casa que consume 10kWh al día?",
    },
    ExampleQuestion {
        label: "Inclinación Óptima",
        question: "¿Cuál es la inclinación óptima para paneles solares en el sur de España?",
    },
    ExampleQuestion {
        label: "Mantenimiento",
        question: "¿Qué mantenimiento básico requieren los paneles solares?",
    },
];

pub fn example_question(index: usize) -> Option<&'static str> {
    EXAMPLE_QUESTIONS.get(index).map(|example| example.question)
}

/// Inline text shown when a remote call fails
pub fn connection_error_message(error: &impl std::fmt::Display) -> String {
    format!("Error al conectar con la IA: {error}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persona_mentions_units_and_safety() {
        assert!(SYSTEM_INSTRUCTION.contains("fotovoltaicas"));
        assert!(SYSTEM_INSTRUCTION.contains("seguridad eléctrica"));
        assert!(SYSTEM_INSTRUCTION.contains("(W, kW, kWh, V, A)"));
    }

    #[test]
    fn test_example_lookup() {
        assert_eq!(EXAMPLE_QUESTIONS.len(), 3);
        assert!(example_question(0).unwrap().starts_with("¿Cómo calculo la capacidad"));
        assert!(example_question(3).is_none());
        for example in EXAMPLE_QUESTIONS {
            assert!(!example.label.is_empty());
            assert!(!example.question.trim().is_empty());
        }
    }

    #[test]
    fn test_connection_error_message() {
        assert_eq!(
            connection_error_message(&"timeout"),
            "Error al conectar con la IA: timeout"
        );
    }
}
