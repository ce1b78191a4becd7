use tracing::debug;

use crate::{
    topic::{KeywordTable, Topic},
    CompletionRequest, CompletionService,
};

pub const DEFAULT_MODEL: &str = "gemini-1.5-pro-latest";

/// Prefix of every reply produced from a failed completion.
pub const ERROR_PREFIX: &str = "An error occurred: ";

// The persona is the only thing keeping the model on gardening topics;
// nothing on the service side enforces it.
const PERSONA: &str = "\n\
You are a helpful Gardening Guide assistant. Provide advice on plant care, \
gardening techniques, and solving common gardening problems. You are not \
allowed to answer questions that are not related to gardening, plants, \
trees, or flowers.\n";

const WORKED_EXAMPLE: &str = "\n\
Human: How often should I water my houseplants?\n\
Assistant: The watering frequency for houseplants depends on several factors \
like the type of plant, pot size, and environmental conditions. As a general \
rule:\n\
1. Check the soil moisture: Stick your finger about an inch into the soil. If \
it feels dry, it's time to water.\n\
2. Most houseplants prefer to dry out slightly between waterings.\n\
3. Water thoroughly until water drains from the bottom of the pot.\n\
4. Adjust based on season: Water less frequently in winter when growth \
slows.\n\
Remember, it's better to underwater than overwater. What type of houseplants \
are you growing?\n";

/// Assembles the text sent to the model: persona, worked example, topic
/// label and the question, separated by blank lines.
#[inline]
#[must_use]
pub fn build_prompt(input: &str, topic: Topic) -> String {
    format!("{PERSONA}\n\n{WORKED_EXAMPLE}\n\n{topic}\n\nHuman: {input}\nAssistant:")
}

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Completion(String),
    Failed(String),
}

impl Outcome {
    #[inline]
    #[must_use]
    pub fn text(&self) -> &str {
        match *self {
            Self::Completion(ref text) | Self::Failed(ref text) => text,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(*self, Self::Failed(_))
    }
}

/// One processed question. Nothing of it outlives the turn.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub input: String,
    pub topic: Topic,
    pub prompt: String,
    pub outcome: Outcome,
}

#[non_exhaustive]
pub struct Advisor {
    service: Box<dyn CompletionService>,
    keywords: KeywordTable,
    model: String,
}

impl Advisor {
    #[inline]
    #[must_use]
    pub fn new(
        service: Box<dyn CompletionService>,
        keywords: KeywordTable,
        model: Option<String>,
    ) -> Self {
        Self {
            service,
            keywords,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_owned()),
        }
    }

    #[inline]
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    #[inline]
    #[must_use]
    pub fn service_name(&self) -> &'static str {
        self.service.name()
    }

    /// Classifies `input` and answers it.
    #[inline]
    pub async fn advise(&self, input: &str) -> Turn {
        let topic = self.keywords.classify(input);
        debug!(%topic, "classified question");
        self.answer(input, topic).await
    }

    /// Sends `input` under an already chosen `topic`.
    ///
    /// Service failures are folded into [`Outcome::Failed`] with a message
    /// starting with [`ERROR_PREFIX`]; this never fails.
    #[inline]
    pub async fn answer(&self, input: &str, topic: Topic) -> Turn {
        let prompt = build_prompt(input, topic);
        debug!(
            service = self.service.name(),
            model = %self.model,
            prompt_len = prompt.len(),
            "requesting completion"
        );

        let request = CompletionRequest::new(&self.model, &prompt);
        let outcome = match self.service.complete(request).await {
            Ok(text) => Outcome::Completion(text),
            Err(err) => {
                debug!(error = %err, "completion failed");
                Outcome::Failed(format!("{ERROR_PREFIX}{err}"))
            }
        };

        Turn {
            input: input.to_owned(),
            topic,
            prompt,
            outcome,
        }
    }
}
