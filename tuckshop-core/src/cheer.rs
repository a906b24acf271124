use chrono::{DateTime, Duration, Local, NaiveTime, Utc};
use crate::{CheerData, DatabaseError, NewCheer, TuckshopContext, TuckshopEvent, UserRole};

/// The append-only board of cheer messages shown on the home screens.
/// Readers only ever ask for today's messages.
pub struct CheerBoard {
    context: TuckshopContext,
}

impl CheerBoard {
    pub fn new(context: &TuckshopContext) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Posts a message and announces it to connected clients
    pub async fn post(&self, new_cheer: NewCheer) -> Result<CheerData, DatabaseError> {
        let cheer = self.context.database.create_cheer(new_cheer).await?;

        self.context
            .events
            .emit(TuckshopEvent::NewCheer(cheer.clone()));

        Ok(cheer)
    }

    /// Today's messages, newest first, optionally narrowed to one audience
    pub async fn today(&self, target: Option<UserRole>) -> Result<Vec<CheerData>, DatabaseError> {
        let (start, end) = today_window();

        self.context.database.cheers_between(start, end, target).await
    }
}

/// Today as the local wall-clock day, expressed in UTC
fn today_window() -> (DateTime<Utc>, DateTime<Utc>) {
    let now = Local::now();
    let since_midnight = now.time() - NaiveTime::MIN;

    let start = (now - since_midnight).with_timezone(&Utc);
    let end = start + Duration::days(1);

    (start, end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryDatabase, Tuckshop};

    fn tuckshop() -> Tuckshop {
        Tuckshop::new(MemoryDatabase::new())
    }

    #[tokio::test]
    async fn posted_messages_show_up_in_today() {
        let tuckshop = tuckshop();

        tuckshop
            .cheer
            .post(NewCheer {
                message: "오늘도 화이팅!".to_string(),
                target: UserRole::Student,
            })
            .await
            .expect("cheer is posted");

        let today = tuckshop.cheer.today(None).await.unwrap();
        assert_eq!(today.len(), 1);
        assert_eq!(today[0].message, "오늘도 화이팅!");
    }

    #[tokio::test]
    async fn posting_announces_the_message() {
        let tuckshop = tuckshop();
        let receiver = tuckshop.events.receiver();

        tuckshop
            .cheer
            .post(NewCheer {
                message: "화이팅!".to_string(),
                target: UserRole::Teacher,
            })
            .await
            .unwrap();

        let event = receiver.try_recv().expect("an event was emitted");
        assert!(matches!(event, TuckshopEvent::NewCheer(_)));
    }

    #[tokio::test]
    async fn empty_messages_are_rejected() {
        let tuckshop = tuckshop();

        let result = tuckshop
            .cheer
            .post(NewCheer {
                message: "   ".to_string(),
                target: UserRole::Student,
            })
            .await;

        assert!(matches!(result, Err(DatabaseError::Validation { .. })));
    }

    #[tokio::test]
    async fn today_narrows_to_one_audience() {
        let tuckshop = tuckshop();

        for (message, target) in [
            ("학생 여러분 화이팅!", UserRole::Student),
            ("선생님들 감사합니다", UserRole::Teacher),
        ] {
            tuckshop
                .cheer
                .post(NewCheer {
                    message: message.to_string(),
                    target,
                })
                .await
                .unwrap();
        }

        let for_students = tuckshop.cheer.today(Some(UserRole::Student)).await.unwrap();
        assert_eq!(for_students.len(), 1);
        assert_eq!(for_students[0].target, UserRole::Student);

        let everything = tuckshop.cheer.today(None).await.unwrap();
        assert_eq!(everything.len(), 2);
    }
}
