//! Stage transitions: sales, pre-bookings and the dealer purchase register.
//!
//! A transition writes the destination record (with the embedded number and
//! one more history event) and deletes the source in the same batch, so a
//! mobile is never in two live stages at once.

use chrono::Utc;
use tracing::info;

use numera_core::{
    DealerPurchaseId, Error, LifecycleEvent, NumberId, PreBookingId, Result, SaleId, WriteBatch,
};

use crate::collections;
use crate::model::{
    Actor, DealerPurchaseRecord, NewDealerPurchase, NumberRecord, PreBookingRecord, SaleDetails,
    SaleRecord,
};
use crate::store::next_sr_no;
use crate::writer::{detailed_description, RegistryWriter};

impl RegistryWriter {
    /// Sells one or more inventory numbers to a buyer.
    pub async fn sell_numbers(
        &self,
        actor: &Actor,
        ids: &[NumberId],
        sale: &SaleDetails,
    ) -> Result<Vec<SaleRecord>> {
        let numbers: Vec<NumberRecord> = self.registry().fetch(collections::NUMBERS).await?;
        let sales: Vec<SaleRecord> = self.registry().fetch(collections::SALES).await?;
        let mut sr_no = next_sr_no(sales.iter().map(|s| s.sr_no));

        let mut batch = WriteBatch::new();
        let mut sold = Vec::with_capacity(ids.len());
        for id in ids {
            let num = numbers
                .iter()
                .find(|n| n.id == *id)
                .ok_or_else(|| Error::resource_not_found("number", id))?;

            let event = LifecycleEvent::new(
                "Sold",
                format!("Sold to {} for ₹{}.", sale.sold_to, sale.sale_price),
                &actor.display_name,
            );
            let mut details = num.details.clone();
            details.history.push(event);

            let record = SaleRecord {
                id: SaleId::generate(),
                sr_no,
                mobile: details.mobile.clone(),
                sum: details.sum,
                sold_to: sale.sold_to.clone(),
                sale_price: sale.sale_price,
                sale_date: sale.sale_date,
                upload_status: details.upload_status,
                created_by: actor.uid.clone(),
                original_number: details,
            };
            sr_no += 1;
            batch = batch
                .put(
                    collections::SALES,
                    record.id.to_string(),
                    serde_json::to_value(&record)?,
                )
                .delete(collections::NUMBERS, id.to_string());
            sold.push(record);
        }

        let affected: Vec<String> = sold.iter().map(|s| s.mobile.to_string()).collect();
        let (action, description) = if sold.len() == 1 {
            (
                "Sold Number",
                format!(
                    "Sold {} to {} for ₹{}",
                    affected[0], sale.sold_to, sale.sale_price
                ),
            )
        } else {
            (
                "Bulk Sold Numbers",
                detailed_description(&format!("Sold to {}:", sale.sold_to), &affected),
            )
        };
        let batch = self.with_activity(batch, actor, action, description).await?;
        self.commit(batch).await?;
        info!(count = sold.len(), buyer = %sale.sold_to, "sold numbers");
        Ok(sold)
    }

    /// Cancels a sale and returns the number to inventory, unassigned.
    pub async fn cancel_sale(&self, actor: &Actor, id: &SaleId) -> Result<NumberRecord> {
        let sales: Vec<SaleRecord> = self.registry().fetch(collections::SALES).await?;
        let sale = sales
            .iter()
            .find(|s| s.id == *id)
            .ok_or_else(|| Error::resource_not_found("sale", id))?;

        let event = LifecycleEvent::new(
            "Sale Cancelled",
            format!(
                "Sale to {} cancelled; number returned to inventory.",
                sale.sold_to
            ),
            &actor.display_name,
        );
        let mut details = sale.original_number.clone();
        details.assigned_to = "Unassigned".to_string();
        details.name = "Unassigned".to_string();
        details.history.push(event);

        let record = NumberRecord {
            id: NumberId::generate(),
            details,
        };
        let batch = WriteBatch::new()
            .put(
                collections::NUMBERS,
                record.id.to_string(),
                serde_json::to_value(&record)?,
            )
            .delete(collections::SALES, id.to_string());
        let batch = self
            .with_activity(
                batch,
                actor,
                "Cancelled Sale",
                format!(
                    "Cancelled sale of {} to {}",
                    record.details.mobile, sale.sold_to
                ),
            )
            .await?;
        self.commit(batch).await?;
        Ok(record)
    }

    /// Parks one or more inventory numbers on the pre-booking list.
    pub async fn pre_book(
        &self,
        actor: &Actor,
        ids: &[NumberId],
    ) -> Result<Vec<PreBookingRecord>> {
        let numbers: Vec<NumberRecord> = self.registry().fetch(collections::NUMBERS).await?;
        let bookings: Vec<PreBookingRecord> =
            self.registry().fetch(collections::PREBOOKINGS).await?;
        let mut sr_no = next_sr_no(bookings.iter().map(|b| b.sr_no));

        let mut batch = WriteBatch::new();
        let mut booked = Vec::with_capacity(ids.len());
        for id in ids {
            let num = numbers
                .iter()
                .find(|n| n.id == *id)
                .ok_or_else(|| Error::resource_not_found("number", id))?;

            let event = LifecycleEvent::new(
                "Pre-Booked",
                "Number moved to the pre-booking list.",
                &actor.display_name,
            );
            let mut details = num.details.clone();
            details.history.push(event);

            let record = PreBookingRecord {
                id: PreBookingId::generate(),
                sr_no,
                mobile: details.mobile.clone(),
                sum: details.sum,
                upload_status: details.upload_status,
                pre_booking_date: Utc::now(),
                created_by: actor.uid.clone(),
                original_number: details,
            };
            sr_no += 1;
            batch = batch
                .put(
                    collections::PREBOOKINGS,
                    record.id.to_string(),
                    serde_json::to_value(&record)?,
                )
                .delete(collections::NUMBERS, id.to_string());
            booked.push(record);
        }

        let affected: Vec<String> = booked.iter().map(|b| b.mobile.to_string()).collect();
        let batch = self
            .with_activity(
                batch,
                actor,
                "Pre-Booked Numbers",
                detailed_description("Pre-booked", &affected),
            )
            .await?;
        self.commit(batch).await?;
        Ok(booked)
    }

    /// Cancels a pre-booking and returns the number to inventory unchanged
    /// apart from the extra history event.
    pub async fn cancel_pre_booking(
        &self,
        actor: &Actor,
        id: &PreBookingId,
    ) -> Result<NumberRecord> {
        let bookings: Vec<PreBookingRecord> =
            self.registry().fetch(collections::PREBOOKINGS).await?;
        let booking = bookings
            .iter()
            .find(|b| b.id == *id)
            .ok_or_else(|| Error::resource_not_found("pre-booking", id))?;

        let event = LifecycleEvent::new(
            "Pre-booking Cancelled",
            "Pre-booking cancelled; number returned to inventory.",
            &actor.display_name,
        );
        let mut details = booking.original_number.clone();
        details.history.push(event);

        let record = NumberRecord {
            id: NumberId::generate(),
            details,
        };
        let batch = WriteBatch::new()
            .put(
                collections::NUMBERS,
                record.id.to_string(),
                serde_json::to_value(&record)?,
            )
            .delete(collections::PREBOOKINGS, id.to_string());
        let batch = self
            .with_activity(
                batch,
                actor,
                "Cancelled Pre-Booking",
                format!("Cancelled pre-booking for {}", record.details.mobile),
            )
            .await?;
        self.commit(batch).await?;
        Ok(record)
    }

    /// Converts pre-bookings straight into sales.
    pub async fn sell_pre_booked(
        &self,
        actor: &Actor,
        ids: &[PreBookingId],
        sale: &SaleDetails,
    ) -> Result<Vec<SaleRecord>> {
        let bookings: Vec<PreBookingRecord> =
            self.registry().fetch(collections::PREBOOKINGS).await?;
        let sales: Vec<SaleRecord> = self.registry().fetch(collections::SALES).await?;
        let mut sr_no = next_sr_no(sales.iter().map(|s| s.sr_no));

        let mut batch = WriteBatch::new();
        let mut sold = Vec::with_capacity(ids.len());
        for id in ids {
            let booking = bookings
                .iter()
                .find(|b| b.id == *id)
                .ok_or_else(|| Error::resource_not_found("pre-booking", id))?;

            let event = LifecycleEvent::new(
                "Sold",
                format!(
                    "Sold from pre-booking to {} for ₹{}.",
                    sale.sold_to, sale.sale_price
                ),
                &actor.display_name,
            );
            let mut details = booking.original_number.clone();
            details.history.push(event);

            let record = SaleRecord {
                id: SaleId::generate(),
                sr_no,
                mobile: details.mobile.clone(),
                sum: details.sum,
                sold_to: sale.sold_to.clone(),
                sale_price: sale.sale_price,
                sale_date: sale.sale_date,
                upload_status: details.upload_status,
                created_by: actor.uid.clone(),
                original_number: details,
            };
            sr_no += 1;
            batch = batch
                .put(
                    collections::SALES,
                    record.id.to_string(),
                    serde_json::to_value(&record)?,
                )
                .delete(collections::PREBOOKINGS, id.to_string());
            sold.push(record);
        }

        let affected: Vec<String> = sold.iter().map(|s| s.mobile.to_string()).collect();
        let (action, description) = if sold.len() == 1 {
            (
                "Sold Pre-Booked Number",
                format!(
                    "Sold pre-booked number {} to {} for ₹{}",
                    affected[0], sale.sold_to, sale.sale_price
                ),
            )
        } else {
            (
                "Bulk Sold Pre-Booked",
                detailed_description(
                    &format!("Sold pre-booked to {}:", sale.sold_to),
                    &affected,
                ),
            )
        };
        let batch = self.with_activity(batch, actor, action, description).await?;
        self.commit(batch).await?;
        Ok(sold)
    }

    /// Records a purchase made directly by a dealer. The mobile must be
    /// absent from every live stage, not just the register.
    pub async fn add_dealer_purchase(
        &self,
        actor: &Actor,
        new: NewDealerPurchase,
    ) -> Result<DealerPurchaseRecord> {
        if self.registry().is_duplicate(new.mobile.as_str(), None).await? {
            return Err(Error::duplicate(new.mobile.as_str()));
        }

        let purchases: Vec<DealerPurchaseRecord> =
            self.registry().fetch(collections::DEALER_PURCHASES).await?;
        let record = DealerPurchaseRecord {
            id: DealerPurchaseId::generate(),
            sr_no: next_sr_no(purchases.iter().map(|p| p.sr_no)),
            sum: new.mobile.digital_root(),
            mobile: new.mobile,
            dealer_name: new.dealer_name,
            price: new.price,
            created_by: actor.uid.clone(),
        };

        let batch = WriteBatch::new().put(
            collections::DEALER_PURCHASES,
            record.id.to_string(),
            serde_json::to_value(&record)?,
        );
        let batch = self
            .with_activity(
                batch,
                actor,
                "Added Dealer Purchase",
                format!(
                    "Recorded purchase of {} by {}",
                    record.mobile, record.dealer_name
                ),
            )
            .await?;
        self.commit(batch).await?;
        Ok(record)
    }

    /// Removes entries from the dealer purchase register.
    pub async fn delete_dealer_purchases(
        &self,
        actor: &Actor,
        ids: &[DealerPurchaseId],
    ) -> Result<()> {
        let purchases: Vec<DealerPurchaseRecord> =
            self.registry().fetch(collections::DEALER_PURCHASES).await?;

        let mut batch = WriteBatch::new();
        let mut affected = Vec::with_capacity(ids.len());
        for id in ids {
            let entry = purchases
                .iter()
                .find(|p| p.id == *id)
                .ok_or_else(|| Error::resource_not_found("dealer purchase", id))?;
            batch = batch.delete(collections::DEALER_PURCHASES, id.to_string());
            affected.push(entry.mobile.to_string());
        }

        let batch = self
            .with_activity(
                batch,
                actor,
                "Deleted Dealer Purchases",
                detailed_description("Deleted dealer purchase entries for", &affected),
            )
            .await?;
        self.commit(batch).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::testutil::{admin, new_number, writer};
    use numera_core::Msisdn;

    fn sale() -> SaleDetails {
        SaleDetails {
            sale_price: 1500.0,
            sold_to: "vipnumberstore".to_string(),
            sale_date: Utc::now(),
        }
    }

    #[tokio::test]
    async fn sell_moves_number_into_sales() {
        let (writer, registry) = writer().await;
        let num = writer
            .add_number(&admin(), new_number("9876543210"))
            .await
            .unwrap();

        let sold = writer
            .sell_numbers(&admin(), &[num.id], &sale())
            .await
            .unwrap();
        assert_eq!(sold.len(), 1);
        assert_eq!(sold[0].sr_no, 1);
        assert_eq!(sold[0].original_number.history.len(), 2);
        assert_eq!(
            sold[0].original_number.history.latest().unwrap().description,
            "Sold to vipnumberstore for ₹1500."
        );

        registry.refresh_all().await.unwrap();
        assert!(registry.numbers().is_empty());
        assert_eq!(registry.sales().len(), 1);
        assert_eq!(registry.activities().last().unwrap().action, "Sold Number");
    }

    #[tokio::test]
    async fn cancel_sale_restores_unassigned() {
        let (writer, registry) = writer().await;
        let num = writer
            .add_number(&admin(), new_number("9876543210"))
            .await
            .unwrap();
        writer
            .assign_numbers(
                &admin(),
                &[num.id],
                "Ravi",
                &crate::writer::LocationUpdate {
                    location_type: crate::model::LocationType::Employee,
                    current_location: "Field".into(),
                },
            )
            .await
            .unwrap();
        let sold = writer
            .sell_numbers(&admin(), &[num.id], &sale())
            .await
            .unwrap();

        let restored = writer.cancel_sale(&admin(), &sold[0].id).await.unwrap();
        assert_eq!(restored.details.assigned_to, "Unassigned");
        assert_eq!(restored.details.name, "Unassigned");
        // Created, Assigned, Sold, Sale Cancelled.
        assert_eq!(restored.details.history.len(), 4);

        registry.refresh_all().await.unwrap();
        assert!(registry.sales().is_empty());
        assert_eq!(registry.numbers().len(), 1);
    }

    #[tokio::test]
    async fn pre_book_then_cancel_round_trips() {
        let (writer, registry) = writer().await;
        let num = writer
            .add_number(&admin(), new_number("9876543210"))
            .await
            .unwrap();

        let booked = writer.pre_book(&admin(), &[num.id]).await.unwrap();
        assert_eq!(booked[0].original_number.history.len(), 2);

        registry.refresh_all().await.unwrap();
        assert!(registry.numbers().is_empty());
        assert_eq!(registry.prebookings().len(), 1);

        let restored = writer
            .cancel_pre_booking(&admin(), &booked[0].id)
            .await
            .unwrap();
        assert_eq!(restored.details.history.len(), 3);

        registry.refresh_all().await.unwrap();
        assert_eq!(registry.numbers().len(), 1);
        assert!(registry.prebookings().is_empty());
    }

    #[tokio::test]
    async fn sell_pre_booked_converts_bookings() {
        let (writer, registry) = writer().await;
        let nums = writer
            .add_numbers_bulk(
                &admin(),
                crate::writer::testutil::template(),
                vec![
                    Msisdn::new("9000000001").unwrap(),
                    Msisdn::new("9000000002").unwrap(),
                ],
            )
            .await
            .unwrap();
        let ids: Vec<_> = nums.iter().map(|n| n.id).collect();
        let booked = writer.pre_book(&admin(), &ids).await.unwrap();
        let booking_ids: Vec<_> = booked.iter().map(|b| b.id).collect();

        let sold = writer
            .sell_pre_booked(&admin(), &booking_ids, &sale())
            .await
            .unwrap();
        assert_eq!(sold.len(), 2);
        assert!(sold[0]
            .original_number
            .history
            .latest()
            .unwrap()
            .description
            .starts_with("Sold from pre-booking to"));

        registry.refresh_all().await.unwrap();
        assert!(registry.prebookings().is_empty());
        assert_eq!(registry.sales().len(), 2);
        assert_eq!(
            registry.activities().last().unwrap().action,
            "Bulk Sold Pre-Booked"
        );
    }

    #[tokio::test]
    async fn dealer_purchase_checks_duplicates_across_stages() {
        let (writer, registry) = writer().await;
        writer
            .add_number(&admin(), new_number("9876543210"))
            .await
            .unwrap();

        let err = writer
            .add_dealer_purchase(
                &admin(),
                NewDealerPurchase {
                    mobile: Msisdn::new("9876543210").unwrap(),
                    dealer_name: "numberwale".to_string(),
                    price: 700.0,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Duplicate { .. }));

        let record = writer
            .add_dealer_purchase(
                &admin(),
                NewDealerPurchase {
                    mobile: Msisdn::new("9000000009").unwrap(),
                    dealer_name: "numberwale".to_string(),
                    price: 700.0,
                },
            )
            .await
            .unwrap();
        assert_eq!(record.sr_no, 1);

        writer
            .delete_dealer_purchases(&admin(), &[record.id])
            .await
            .unwrap();
        registry.refresh_all().await.unwrap();
        assert!(registry.dealer_purchases().is_empty());
    }
}
