//! Scenario Registry
//!
//! Static roleplay configuration: each scenario pairs a persona with one or
//! more objective variants. A variant is drawn uniformly at random whenever a
//! new practice session starts.

use crate::dialogue::{DialogueMessage, Persona};
use crate::error::{PracticeError, PracticeResult};
use rand::Rng;
use serde::Serialize;

/// One way a scenario can play out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectiveVariant {
    /// Scene-setting text shown before the conversation begins.
    pub intro: String,
    /// The goal the learner must explicitly achieve.
    pub objective: String,
    /// The persona's opening line.
    pub opening: DialogueMessage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Scenario {
    pub id: String,
    pub title: String,
    pub description: String,
    pub persona: Persona,
    pub objectives: Vec<ObjectiveVariant>,
}

impl Scenario {
    /// Picks an objective variant uniformly at random.
    pub fn choose_objective<R: Rng + ?Sized>(&self, rng: &mut R) -> PracticeResult<&ObjectiveVariant> {
        if self.objectives.is_empty() {
            return Err(PracticeError::invalid_input(format!(
                "scenario '{}' has no objectives",
                self.id
            )));
        }
        let idx = rng.random_range(0..self.objectives.len());
        Ok(&self.objectives[idx])
    }
}

/// The read-only set of scenarios available for practice.
#[derive(Debug, Clone)]
pub struct ScenarioRegistry {
    scenarios: Vec<Scenario>,
}

impl ScenarioRegistry {
    pub fn new(scenarios: Vec<Scenario>) -> Self {
        Self { scenarios }
    }

    pub fn list_scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    pub fn get(&self, id: &str) -> PracticeResult<&Scenario> {
        self.scenarios
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| PracticeError::UnknownScenario(id.to_string()))
    }

    /// The five scenarios shipped with the application.
    pub fn builtin() -> Self {
        Self::new(vec![
            scenario(
                "restaurant",
                "At the Restaurant",
                "Practice ordering food, asking for the bill, and interacting with a waiter.",
                Persona::new("Alireza", "a friendly waiter"),
                vec![
                    variant(
                        "You've just been seated at a restaurant. The waiter, Alireza, approaches your table.",
                        "You are very hungry. Greet the waiter and order a main course and a drink for yourself.",
                        "سلام، خوش آمدید! چی میل دارید؟",
                        "Salaam, khosh amadid! Chi meyl daarid?",
                    ),
                    variant(
                        "You have finished your meal and you want to pay.",
                        "Ask for the bill, pay for your meal, and thank the waiter.",
                        "غذا چطور بود؟ چیز دیگری میل دارید؟",
                        "Ghazā chetor bud? Chiz-e digari meil dārid?",
                    ),
                ],
            ),
            scenario(
                "store",
                "At the Store",
                "Practice buying items, asking for prices, and interacting with a shopkeeper.",
                Persona::new("Mahsa", "a helpful shopkeeper"),
                vec![
                    variant(
                        "You walk into a small grocery store. The shopkeeper, Mahsa, greets you.",
                        "Ask for the price of three items and then decide to buy two of them.",
                        "سلام، خوش آمدید! چی لازم دارید؟",
                        "Salaam, khosh amadid! Chi laazem daarid?",
                    ),
                    variant(
                        "You are at a local shop to buy some fruit. The shopkeeper, Mahsa, is arranging some apples.",
                        "Ask if they have any watermelon, and if so, buy one.",
                        "سلام، بفرمایید.",
                        "Salaam, befarmaayid.",
                    ),
                ],
            ),
            scenario(
                "work",
                "At Work",
                "Practice professional interactions, talking about projects, and making small talk with colleagues.",
                Persona::new("Amir", "a friendly colleague"),
                vec![
                    variant(
                        "It's the morning and you see your colleague, Amir, by the coffee machine.",
                        "Greet your colleague and ask them how their weekend was.",
                        "سلام، صبح بخیر!",
                        "Salaam, sobh bekhair!",
                    ),
                    variant(
                        "You need to ask your colleague Amir for help with a presentation.",
                        "Explain that you're working on a presentation and ask if they have a moment to review it with you.",
                        "سلام، وقت داری؟",
                        "Salaam, vaght daari?",
                    ),
                ],
            ),
            scenario(
                "city",
                "Around the City",
                "Practice asking for directions, taking a taxi, and navigating a bustling city environment.",
                Persona::new("Reza", "a helpful taxi driver"),
                vec![
                    variant(
                        "You've just gotten into a taxi. The driver, Reza, greets you.",
                        "Tell the taxi driver you want to go to the Azadi Tower and ask how much it will cost.",
                        "سلام آقا، کجا برم؟",
                        "Salaam agha, koja beram?",
                    ),
                    variant(
                        "You are lost in Tehran and you see a police officer.",
                        "Politely ask the officer for directions to the nearest metro station.",
                        "ببخشید، می توانم کمکتان کنم؟",
                        "Bebakshid, mitavaanam komaketaan konam?",
                    ),
                ],
            ),
            scenario(
                "family",
                "With Family",
                "Practice informal chats, talking about your day, and interacting with family members.",
                Persona::new("Maman Bozorg", "your kind grandmother"),
                vec![
                    variant(
                        "Your grandmother, Maman Bozorg, calls you on the phone.",
                        "Greet your grandmother, ask how she is, and tell her that you will visit her tomorrow.",
                        "سلام عزیزم، چطوری؟",
                        "Salaam azizam, chetori?",
                    ),
                    variant(
                        "You are at a family gathering. Your aunt asks you what you've been up to.",
                        "Tell your aunt that you've been busy with work, but that it's going well.",
                        "چه خبر؟ خیلی وقته ندیدمت!",
                        "Che khabar? Kheili vaghte nadidamet!",
                    ),
                ],
            ),
        ])
    }
}

impl Default for ScenarioRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn scenario(
    id: &str,
    title: &str,
    description: &str,
    persona: Persona,
    objectives: Vec<ObjectiveVariant>,
) -> Scenario {
    Scenario {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        persona,
        objectives,
    }
}

fn variant(intro: &str, objective: &str, farsi: &str, finglish: &str) -> ObjectiveVariant {
    ObjectiveVariant {
        intro: intro.to_string(),
        objective: objective.to_string(),
        opening: DialogueMessage::model(farsi, finglish),
    }
}
