use thiserror::Error;

use crate::{ApiClient, CancelToken, ClientError, Item, NewOrderRequest, Order};

const MIN_QUANTITY: i32 = 1;
const MAX_QUANTITY: i32 = 10;

/// Who is ordering, as carried on the order record
#[derive(Debug, Clone)]
pub struct Requester {
    pub name: String,
    pub job: String,
}

/// The item fields copied onto the order when it is placed
#[derive(Debug, Clone)]
pub struct Selection {
    pub menu: String,
    pub image: String,
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("Nothing is selected")]
    NothingSelected,
    #[error(transparent)]
    Client(#[from] ClientError),
}

/// The order submission flow: pick an item, pick a quantity, submit.
///
/// Submitting clears the selection on success and leaves everything in
/// place on failure so the user can retry. There is no double-submit
/// protection, two submits produce two orders.
#[derive(Debug)]
pub struct OrderForm {
    requester: Requester,
    selection: Option<Selection>,
    quantity: i32,
}

impl OrderForm {
    pub fn new(requester: Requester) -> Self {
        Self {
            requester,
            selection: None,
            quantity: MIN_QUANTITY,
        }
    }

    pub fn select(&mut self, item: &Item) {
        self.selection = Some(Selection {
            menu: item.name.clone(),
            image: item.image.clone(),
        });
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn quantity(&self) -> i32 {
        self.quantity
    }

    /// Quantity is bounded on this side only, the server takes any positive
    /// amount
    pub fn set_quantity(&mut self, quantity: i32) {
        self.quantity = quantity.clamp(MIN_QUANTITY, MAX_QUANTITY);
    }

    pub async fn submit(
        &mut self,
        api: &ApiClient,
        cancel: &CancelToken,
    ) -> Result<Order, SubmitError> {
        let selection = self.selection.as_ref().ok_or(SubmitError::NothingSelected)?;

        let order = api
            .place_order(
                cancel,
                &NewOrderRequest {
                    student_name: self.requester.name.clone(),
                    user_job: self.requester.job.clone(),
                    menu: selection.menu.clone(),
                    quantity: self.quantity,
                    image: selection.image.clone(),
                },
            )
            .await?;

        self.selection = None;
        self.quantity = MIN_QUANTITY;

        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn requester() -> Requester {
        Requester {
            name: "홍길동".to_string(),
            job: "게임개발".to_string(),
        }
    }

    fn cola() -> Item {
        Item {
            id: 1,
            name: "콜라".to_string(),
            item_type: "drink".to_string(),
            image: "https://media.example/cola.png".to_string(),
            stock: true,
        }
    }

    #[test]
    fn quantity_is_clamped_to_the_ui_bounds() {
        let mut form = OrderForm::new(requester());

        form.set_quantity(0);
        assert_eq!(form.quantity(), 1);

        form.set_quantity(25);
        assert_eq!(form.quantity(), 10);

        form.set_quantity(5);
        assert_eq!(form.quantity(), 5);
    }

    #[tokio::test]
    async fn submitting_without_a_selection_fails_fast() {
        let api = ApiClient::new("http://127.0.0.1:9");
        let mut form = OrderForm::new(requester());

        let result = form.submit(&api, &CancelToken::new()).await;
        assert!(matches!(result, Err(SubmitError::NothingSelected)));
    }

    #[tokio::test]
    async fn failed_submits_leave_the_form_alone() {
        // Nothing listens on this address, so the submit fails
        let api = ApiClient::new("http://127.0.0.1:9");
        let mut form = OrderForm::new(requester());

        form.select(&cola());
        form.set_quantity(2);

        let result = form.submit(&api, &CancelToken::new()).await;
        assert!(result.is_err());

        assert!(form.selection().is_some());
        assert_eq!(form.quantity(), 2);
    }
}
