use crate::libserver::client::{PlayerSlot, RoundResult, Verdict};

pub const WELCOME: &str = "Bienvenue au Shifumi!";
pub const WAITING_FOR_PLAYER: &str = "En attente du deuxieme joueur...";
pub const GAME_STARTS: &str = "Les deux joueurs sont connectes! Que le jeu commence!";
pub const CHOICES: &str = "Choix disponibles: Pierre, Feuille, Ciseaux";
pub const CHOICE_PROMPT: &str = "Votre choix (Pierre/Feuille/Ciseaux):";
pub const INVALID_CHOICE: &str = "Choix invalide! Reessayez.";
pub const WAITING_FOR_OPPONENT: &str = "En attente de l'adversaire...";
pub const OPPONENT_CHOSE: &str = "Votre adversaire a fait son choix.";
pub const CONTINUE_PROMPT: &str = "Continuer? (O/N):";
pub const GOODBYE: &str = "Merci d'avoir joue!";
pub const OPPONENT_DECLINED: &str = "Votre adversaire a arrete la partie.";
pub const OPPONENT_DISCONNECTED: &str = "Votre adversaire s'est deconnecte.";

pub const WON: &str = "Vous avez gagne!";
pub const LOST: &str = "Vous avez perdu!";
pub const TIE: &str = "Egalite!";
pub const SCORE: &str = "Score:";
pub const SLOT: &str = "Vous etes le joueur";

pub fn slot(slot: PlayerSlot) -> String {
    format!("{} {}", SLOT, slot.number())
}

pub fn outcome(result: &RoundResult, slot: PlayerSlot) -> String {
    let status = match result.verdict(slot) {
        Verdict::Won => WON,
        Verdict::Lost => LOST,
        Verdict::Tie => TIE,
    };
    format!(
        "{} Joueur1: {} vs Joueur2: {}",
        status, result.choices[0], result.choices[1]
    )
}

/// Own score first.
pub fn score(result: &RoundResult, slot: PlayerSlot) -> String {
    format!(
        "{} {} - {}",
        SCORE,
        result.score_of(slot),
        result.score_of(slot.other())
    )
}
