//! Cart resolution planning.
//!
//! Every request works against exactly one cart. Which one depends on the
//! cart id remembered by the client session and on the logged-in user. This
//! module decides *what* has to happen; the storefront's cart service carries
//! the plan out against its store.
//!
//! | user | user cart | session cart              | plan              |
//! |------|-----------|---------------------------|-------------------|
//! | no   | -         | exists                    | `UseSessionCart`  |
//! | no   | -         | missing                   | `CreateAnonymous` |
//! | yes  | none      | exists, anonymous         | `Adopt`           |
//! | yes  | none      | missing or someone else's | `CreateForUser`   |
//! | yes  | exists    | other cart, anonymous     | `Merge`           |
//! | yes  | exists    | anything else             | `UseUserCart`     |

use serde::Serialize;

use crate::cart::Cart;
use crate::types::{CartId, UserId};

/// What to do to obtain the active cart for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "plan", rename_all = "snake_case")]
pub enum Resolution {
    /// Anonymous visitor whose session cart still exists.
    UseSessionCart(CartId),
    /// Anonymous visitor without a usable session cart.
    CreateAnonymous,
    /// Logged-in user whose own cart is the answer.
    UseUserCart(CartId),
    /// Logged-in user without a cart takes over the anonymous session cart.
    Adopt { cart: CartId, user: UserId },
    /// Fold the anonymous session cart into the user's cart, then discard it.
    Merge { source: CartId, target: CartId },
    /// Logged-in user without any cart to reuse.
    CreateForUser(UserId),
}

impl Resolution {
    /// True for plans that write to the store.
    #[must_use]
    pub const fn is_mutating(&self) -> bool {
        !matches!(self, Self::UseSessionCart(_) | Self::UseUserCart(_))
    }
}

/// Decide how to resolve the active cart.
///
/// `session_cart` is the cart the session id points at, already looked up:
/// a dangling id is passed as `None` and treated exactly like no id at all.
/// `user_cart` is the cart owned by `user` and is ignored for anonymous
/// requests.
#[must_use]
pub fn plan(user: Option<UserId>, session_cart: Option<&Cart>, user_cart: Option<&Cart>) -> Resolution {
    let Some(user) = user else {
        return session_cart.map_or(Resolution::CreateAnonymous, |cart| {
            Resolution::UseSessionCart(cart.id)
        });
    };

    match (user_cart, session_cart) {
        (Some(own), Some(session)) if session.id != own.id && session.is_anonymous() => {
            Resolution::Merge {
                source: session.id,
                target: own.id,
            }
        }
        (Some(own), _) => Resolution::UseUserCart(own.id),
        (None, Some(session)) if session.is_anonymous() => Resolution::Adopt {
            cart: session.id,
            user,
        },
        (None, Some(session)) if session.is_owned_by(user) => Resolution::UseUserCart(session.id),
        (None, _) => Resolution::CreateForUser(user),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::CartOwner;

    fn anonymous(id: i32) -> Cart {
        Cart {
            id: CartId::new(id),
            owner: CartOwner::Anonymous,
            created_at: Utc::now(),
        }
    }

    fn owned(id: i32, user: i32) -> Cart {
        Cart {
            id: CartId::new(id),
            owner: CartOwner::User(UserId::new(user)),
            created_at: Utc::now(),
        }
    }

    const ALICE: UserId = UserId::new(1);

    #[test]
    fn test_anonymous_reuses_session_cart() {
        let cart = anonymous(10);
        assert_eq!(
            plan(None, Some(&cart), None),
            Resolution::UseSessionCart(CartId::new(10))
        );
    }

    #[test]
    fn test_anonymous_without_cart_creates_one() {
        assert_eq!(plan(None, None, None), Resolution::CreateAnonymous);
    }

    #[test]
    fn test_login_adopts_anonymous_cart() {
        let cart = anonymous(10);
        assert_eq!(
            plan(Some(ALICE), Some(&cart), None),
            Resolution::Adopt {
                cart: CartId::new(10),
                user: ALICE
            }
        );
    }

    #[test]
    fn test_login_merges_into_existing_cart() {
        let session = anonymous(10);
        let own = owned(20, 1);
        assert_eq!(
            plan(Some(ALICE), Some(&session), Some(&own)),
            Resolution::Merge {
                source: CartId::new(10),
                target: CartId::new(20)
            }
        );
    }

    #[test]
    fn test_user_cart_already_in_session() {
        let own = owned(20, 1);
        assert_eq!(
            plan(Some(ALICE), Some(&own), Some(&own)),
            Resolution::UseUserCart(CartId::new(20))
        );
        assert_eq!(
            plan(Some(ALICE), None, Some(&own)),
            Resolution::UseUserCart(CartId::new(20))
        );
    }

    #[test]
    fn test_never_takes_another_users_cart() {
        let someone_else = owned(30, 2);
        assert_eq!(
            plan(Some(ALICE), Some(&someone_else), None),
            Resolution::CreateForUser(ALICE)
        );

        let own = owned(20, 1);
        assert_eq!(
            plan(Some(ALICE), Some(&someone_else), Some(&own)),
            Resolution::UseUserCart(CartId::new(20))
        );
    }

    #[test]
    fn test_user_without_any_cart() {
        assert_eq!(plan(Some(ALICE), None, None), Resolution::CreateForUser(ALICE));
        assert!(Resolution::CreateForUser(ALICE).is_mutating());
        assert!(!Resolution::UseUserCart(CartId::new(1)).is_mutating());
    }
}
