//! Plain-text rendering of a finished run.
//!
//! Sections appear in a fixed order: classification, then the sales ticket,
//! then the support ticket. Both tickets may be present. List sub-sections are
//! emitted only for non-empty lists, and bundles keep the backend's order.

use std::fmt::{self, Write as _};

use crate::model::{Bundle, Classification, FinalResult, Recommendation, SalesTicket, SupportTicket};

/// Formats the final result as the assistant's reply.
pub fn format_final(result: &FinalResult) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_final(&mut out, result);
    out
}

fn write_final(out: &mut String, result: &FinalResult) -> fmt::Result {
    write_classification(out, &result.classification)?;
    if let Some(sales) = &result.sales {
        write_sales(out, sales)?;
    }
    if let Some(support) = &result.support {
        write_support(out, support)?;
    }
    Ok(())
}

fn write_classification(out: &mut String, cls: &Classification) -> fmt::Result {
    writeln!(out, "✅ Classification:")?;
    writeln!(out, "- Category: {}", cls.category)?;
    writeln!(out, "- Intent: {}", cls.intent)?;
    writeln!(out, "- Confidence: {}", cls.confidence)?;
    writeln!(out, "- Reasoning: {}", cls.reasoning)
}

fn write_sales(out: &mut String, sales: &SalesTicket) -> fmt::Result {
    writeln!(out, "\n🧾 Sales Ticket: {}", sales.ticket_id)?;
    writeln!(out, "{}", sales.message_to_rep)?;

    if let Some(recommendations) = non_empty(&sales.recommendations) {
        writeln!(out, "\n📦 Recommendations:")?;
        for (i, rec) in recommendations.iter().enumerate() {
            write_recommendation(out, i + 1, rec)?;
        }
    }

    if let Some(bundles) = non_empty(&sales.bundles) {
        writeln!(out, "\n🎁 Bundle Options (sorted by price):")?;
        for (i, bundle) in bundles.iter().enumerate() {
            write_bundle(out, i + 1, bundle)?;
        }
    }

    write_follow_ups(out, &sales.follow_up_questions)
}

fn write_recommendation(out: &mut String, n: usize, rec: &Recommendation) -> fmt::Result {
    writeln!(out, "  {n}) {} ({}) - ${}", rec.name, rec.sku, rec.price_usd)?;
    writeln!(out, "     Purpose: {}", rec.purpose)?;
    writeln!(out, "     Score: {}", rec.score)?;
    writeln!(out, "     Reason: {}", rec.reasoning)
}

fn write_bundle(out: &mut String, n: usize, bundle: &Bundle) -> fmt::Result {
    writeln!(out, "  {n}) {} - ${}", bundle.name, bundle.total_price_usd)?;
    writeln!(out, "     Items: {}", bundle.items.join(", "))?;
    writeln!(out, "     Score: {}", bundle.score)?;
    writeln!(out, "     Reason: {}", bundle.reasoning)
}

fn write_support(out: &mut String, support: &SupportTicket) -> fmt::Result {
    writeln!(out, "\n🛠 Support Ticket: {}", support.ticket_id)?;
    writeln!(out, "{}", support.message_to_rep)?;
    write_follow_ups(out, &support.follow_up_questions)
}

fn write_follow_ups(out: &mut String, questions: &Option<Vec<String>>) -> fmt::Result {
    let Some(questions) = non_empty(questions) else {
        return Ok(());
    };
    writeln!(out, "\n❓ Follow-up Questions:")?;
    for (i, question) in questions.iter().enumerate() {
        writeln!(out, "  {}) {question}", i + 1)?;
    }
    Ok(())
}

fn non_empty<T>(items: &Option<Vec<T>>) -> Option<&[T]> {
    items.as_deref().filter(|items| !items.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classification() -> Classification {
        Classification {
            category: "sales".into(),
            intent: "best_price_offer_or_bundling".into(),
            confidence: 0.92,
            reasoning: "Asks for a bundle quote.".into(),
        }
    }

    fn sales_ticket() -> SalesTicket {
        SalesTicket {
            ticket_id: "SR-1".into(),
            message_to_rep: "Send a quote.".into(),
            recommendations: None,
            bundles: None,
            follow_up_questions: None,
        }
    }

    #[test]
    fn classification_only_renders_one_section() {
        let text = format_final(&FinalResult {
            classification: classification(),
            sales: None,
            support: None,
        });
        assert_eq!(
            text,
            "✅ Classification:\n- Category: sales\n- Intent: best_price_offer_or_bundling\n- Confidence: 0.92\n- Reasoning: Asks for a bundle quote.\n"
        );
        assert!(!text.contains("Sales Ticket"));
        assert!(!text.contains("Support Ticket"));
    }

    #[test]
    fn empty_lists_render_no_sub_headers() {
        let mut sales = sales_ticket();
        sales.recommendations = Some(vec![]);
        sales.bundles = Some(vec![]);
        sales.follow_up_questions = Some(vec![]);
        let text = format_final(&FinalResult {
            classification: classification(),
            sales: Some(sales),
            support: None,
        });
        assert!(text.contains("\n🧾 Sales Ticket: SR-1\nSend a quote.\n"));
        assert!(!text.contains("Recommendations"));
        assert!(!text.contains("Bundle Options"));
        assert!(!text.contains("Follow-up Questions"));
    }

    #[test]
    fn full_sales_ticket_lists_in_received_order() {
        let mut sales = sales_ticket();
        sales.recommendations = Some(vec![Recommendation {
            name: "Laptop Pro 14".into(),
            sku: "LP-14".into(),
            price_usd: 1299.0,
            purpose: "Development".into(),
            score: 0.9,
            reasoning: "Matches the stated workload.".into(),
        }]);
        sales.bundles = Some(vec![
            Bundle {
                name: "Premium".into(),
                total_price_usd: 2100.5,
                items: vec!["LP-14".into(), "DOCK-1".into()],
                score: 0.7,
                reasoning: "Everything included.".into(),
            },
            Bundle {
                name: "Starter".into(),
                total_price_usd: 1400.0,
                items: vec!["LP-14".into()],
                score: 0.8,
                reasoning: "Cheapest option.".into(),
            },
        ]);
        sales.follow_up_questions = Some(vec!["How many seats?".into()]);
        let text = format_final(&FinalResult {
            classification: classification(),
            sales: Some(sales),
            support: None,
        });

        assert!(text.contains(
            "\n📦 Recommendations:\n  1) Laptop Pro 14 (LP-14) - $1299\n     Purpose: Development\n     Score: 0.9\n     Reason: Matches the stated workload.\n"
        ));
        assert!(text.contains(
            "\n🎁 Bundle Options (sorted by price):\n  1) Premium - $2100.5\n     Items: LP-14, DOCK-1\n"
        ));
        let premium = text.find("Premium").expect("premium");
        let starter = text.find("Starter").expect("starter");
        assert!(premium < starter);
        assert!(text.ends_with("\n❓ Follow-up Questions:\n  1) How many seats?\n"));
    }

    #[test]
    fn sales_and_support_render_together() {
        let text = format_final(&FinalResult {
            classification: classification(),
            sales: Some(sales_ticket()),
            support: Some(SupportTicket {
                ticket_id: "SUP-9".into(),
                message_to_rep: "Check warranty.".into(),
                follow_up_questions: Some(vec!["Serial number?".into(), "Purchase date?".into()]),
            }),
        });
        let sales_at = text.find("🧾 Sales Ticket: SR-1").expect("sales");
        let support_at = text.find("🛠 Support Ticket: SUP-9").expect("support");
        assert!(sales_at < support_at);
        assert!(text.ends_with(
            "Check warranty.\n\n❓ Follow-up Questions:\n  1) Serial number?\n  2) Purchase date?\n"
        ));
    }
}
