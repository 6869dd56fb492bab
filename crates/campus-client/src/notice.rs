use tokio::sync::broadcast;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// A transient user-facing message (toast).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub description: Option<String>,
}

impl Notice {
    pub fn new(level: NoticeLevel, title: &str, description: Option<&str>) -> Self {
        Self {
            level,
            title: title.to_string(),
            description: description.map(str::to_string),
        }
    }

    pub fn favorite_sign_in() -> Self {
        Self::new(
            NoticeLevel::Error,
            "Connexion requise",
            Some("Veuillez vous connecter pour ajouter des favoris"),
        )
    }

    pub fn club_sign_in() -> Self {
        Self::new(
            NoticeLevel::Error,
            "Connexion requise",
            Some("Vous devez être connecté pour rejoindre un club"),
        )
    }

    pub fn favorite_added() -> Self {
        Self::new(
            NoticeLevel::Success,
            "Ajouté aux favoris",
            Some("L'élément a été ajouté à vos favoris"),
        )
    }

    pub fn favorite_removed() -> Self {
        Self::new(
            NoticeLevel::Success,
            "Supprimé des favoris",
            Some("L'élément a été retiré de vos favoris"),
        )
    }

    pub fn favorite_failed() -> Self {
        Self::new(NoticeLevel::Error, "Erreur", Some("Impossible de modifier les favoris"))
    }

    pub fn club_joined() -> Self {
        Self::new(NoticeLevel::Success, "Vous avez rejoint le club", None)
    }

    pub fn club_left() -> Self {
        Self::new(NoticeLevel::Info, "Vous avez quitté le club", None)
    }

    pub fn membership_failed() -> Self {
        Self::new(NoticeLevel::Error, "Erreur", Some("Impossible de modifier votre adhésion"))
    }
}

/// Fan-out of notices to whatever renders them.
#[derive(Clone)]
pub struct Notices {
    tx: broadcast::Sender<Notice>,
}

impl Default for Notices {
    fn default() -> Self {
        Self::new(32)
    }
}

impl Notices {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.tx.subscribe()
    }

    pub fn emit(&self, notice: Notice) {
        if self.tx.send(notice).is_err() {
            debug!("Notice dropped, nobody is listening");
        }
    }
}
