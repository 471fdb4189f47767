//! Shop purchases.
//!
//! Purchases spend the wallet (`xp`) only - never `lifetime_xp` or
//! `this_week_xp` - so buying can never cause a level-down or a ranking
//! drop. Voucher purchases claim exactly one unused coupon code inside the
//! transaction, so two concurrent buyers can never receive the same code.

use crate::{activity, paths, read_user_pair, stage_user_pair, RewardEngine};
use squadquest_core::{
    ActivityEntry, ActivityKind, CouponCode, EngineError, EngineResult, ItemKind, Redemption,
    ShopItem, Timestamp,
};
use squadquest_store::collections;
use uuid::Uuid;

/// Kind-specific result of a purchase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurchaseDetail {
    Cosmetic {
        frame: String,
    },
    Voucher {
        code: String,
        redemption_id: Uuid,
        expires_at: Timestamp,
    },
    Badge {
        badge: String,
    },
    Consumable {
        item: String,
        count: i64,
    },
}

/// Result of a successful purchase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseOutcome {
    pub new_balance: i64,
    pub detail: PurchaseDetail,
}

impl RewardEngine {
    /// Purchase a shop item for the calling user.
    pub async fn purchase(
        &self,
        user_id: Uuid,
        item_id: &str,
        now: Timestamp,
    ) -> EngineResult<PurchaseOutcome> {
        let rules = self.rules();
        let outcome = self.store().run_transaction(|tx| {
            let item: ShopItem = tx
                .get(&paths::shop_item(item_id))?
                .ok_or_else(|| EngineError::not_found("Item", item_id))?;
            let (mut profile, mut stats) = read_user_pair(tx, user_id)?;

            // Vouchers also need the coupon pool; scan it while still in the
            // read phase. The matched coupon is version-tracked, so a
            // concurrent claim of the same code conflicts at commit.
            let available_coupon: Option<CouponCode> = if item.kind == ItemKind::Voucher {
                let mut coupons: Vec<CouponCode> = tx.scan(collections::COUPON_CODES)?;
                coupons.retain(|c| c.item_id == item.item_id && !c.is_used);
                coupons.sort_by(|a, b| a.coupon_id.cmp(&b.coupon_id));
                coupons.into_iter().next()
            } else {
                None
            };

            if stats.xp < item.cost {
                return Err(EngineError::precondition("Insufficient XP"));
            }

            let detail = match item.kind {
                ItemKind::Cosmetic => {
                    let frame = item.grant_key().to_string();
                    if !stats.owned_frames.insert(frame.clone()) {
                        return Err(EngineError::precondition("Already owned"));
                    }
                    profile.equipped_frame = Some(frame.clone());
                    PurchaseDetail::Cosmetic { frame }
                }
                ItemKind::Badge => {
                    let badge = item.grant_key().to_string();
                    if !stats.unlock_badge(&badge) {
                        return Err(EngineError::precondition("Already owned"));
                    }
                    PurchaseDetail::Badge { badge }
                }
                ItemKind::Consumable => {
                    let key = item.grant_key().to_string();
                    let count = stats.consumable_count(&key) + 1;
                    stats.inventory.insert(key.clone(), count);
                    PurchaseDetail::Consumable { item: key, count }
                }
                ItemKind::Voucher => {
                    let mut coupon = available_coupon.ok_or(EngineError::OutOfStock)?;
                    coupon.is_used = true;
                    coupon.used_by = Some(user_id);
                    coupon.used_at = Some(now);

                    let redemption = Redemption {
                        redemption_id: squadquest_core::new_entity_id(),
                        user_id,
                        item_id: item.item_id.clone(),
                        code: coupon.code.clone(),
                        expires_at: now + rules.redemption_validity(),
                        created_at: now,
                    };
                    tx.set(&paths::coupon(coupon.coupon_id), &coupon)?;
                    tx.set(&paths::redemption(redemption.redemption_id), &redemption)?;
                    PurchaseDetail::Voucher {
                        code: coupon.code,
                        redemption_id: redemption.redemption_id,
                        expires_at: redemption.expires_at,
                    }
                }
            };

            stats.spend(item.cost);
            stage_user_pair(tx, &mut profile, &mut stats, now)?;
            activity::record(
                tx,
                &ActivityEntry::new(
                    ActivityKind::ShopPurchase,
                    user_id,
                    profile.name.clone(),
                    item.item_id.clone(),
                    0,
                    now,
                ),
            )?;

            Ok(PurchaseOutcome {
                new_balance: stats.xp,
                detail,
            })
        })?;

        tracing::info!(user_id = %user_id, item_id, "shop purchase");
        Ok(outcome)
    }

    /// All purchasable items.
    pub async fn list_shop_items(&self) -> EngineResult<Vec<ShopItem>> {
        let mut items: Vec<ShopItem> = self.store().scan(collections::SHOP_ITEMS)?;
        items.sort_by(|a, b| a.item_id.cmp(&b.item_id));
        Ok(items)
    }

    /// Upsert a shop item (admin surface and seeds).
    pub async fn upsert_shop_item(&self, item: &ShopItem) -> EngineResult<()> {
        self.store().run_transaction(|tx| {
            let _: Option<ShopItem> = tx.get(&paths::shop_item(&item.item_id))?;
            tx.set(&paths::shop_item(&item.item_id), item)?;
            Ok(())
        })
    }

    /// Load coupon codes for a voucher item (admin surface and seeds).
    pub async fn add_coupons(&self, item_id: &str, codes: &[String]) -> EngineResult<usize> {
        self.store().run_transaction(|tx| {
            let item: Option<ShopItem> = tx.get(&paths::shop_item(item_id))?;
            if item.is_none() {
                return Err(EngineError::not_found("Item", item_id));
            }
            for code in codes {
                let coupon = CouponCode::new(item_id, code.clone());
                tx.set(&paths::coupon(coupon.coupon_id), &coupon)?;
            }
            Ok(codes.len())
        })
    }
}
