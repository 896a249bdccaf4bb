//! End-to-end tests wiring link intake, the domain-balancing scheduler, and
//! a goal together the way an embedding crawl loop would.

use riptide_scheduler::{
    BalancedScheduler, FormFindingGoal, Goal, LinkIntake, LinkIntakeConfig, RelevancyGoal,
    RelevancyGoalConfig, Request, Response, ResponseContent,
};
use std::collections::HashMap;
use std::str::FromStr;
use url::Url;

mod full_crawl_round_trip {
    use super::*;

    /// A response comes in, the goal scores it, outbound links are taken
    /// from the page, canonicalized, and pushed back into the scheduler
    /// tagged with their own domain.
    #[test]
    fn response_to_outbound_requests_round_trip() {
        let mut scheduler = BalancedScheduler::new(0.0, 1.0, true);
        let mut intake = LinkIntake::new(LinkIntakeConfig::default());
        let mut goal = RelevancyGoal::new(
            RelevancyGoalConfig {
                relevancy_threshold: 0.5,
                max_requests_per_domain: None,
                max_relevant_pages_per_domain: Some(1),
            },
            Box::new(|text: &str| if text.contains("widgets") { 0.9 } else { 0.1 }),
        );

        let seed = Request::new(Url::from_str("https://a.example/start").unwrap(), 0)
            .with_slot("a.example");
        scheduler.push(seed).unwrap();

        let popped = scheduler.pop().expect("seed request should pop");
        assert_eq!(popped.url.as_str(), "https://a.example/start");

        let response = Response::new(
            popped.url.clone(),
            ResponseContent::Text("a page all about widgets".to_string()),
        )
        .with_domain("a.example");

        let reward = goal.get_reward(&response);
        assert!((reward - 0.9).abs() < 1e-9);
        goal.response_observed(&response);
        assert!(goal.is_achieved_for("a.example"));

        let outbound = intake.intake(
            &response.url,
            ["/widgets/1", "https://b.example/other", "mailto:x@a.example"],
        );
        assert_eq!(outbound.len(), 2);

        for link in outbound {
            let domain = link.host_str().unwrap().to_string();
            let priority = riptide_scheduler::priority::score_to_priority(reward);
            let request = Request::new(link, priority).with_slot(domain.clone());
            scheduler.push(request).unwrap();
        }

        assert!(scheduler.get_active_slots().contains(&"a.example".to_string()));
        assert!(scheduler.get_active_slots().contains(&"b.example".to_string()));

        // The goal is satisfied for a.example; the embedding crawl loop
        // closes it, which drops its remaining backlog immediately.
        let dropped = scheduler.close_queue("a.example");
        assert_eq!(dropped, 1);
        assert!(scheduler.push(
            Request::new(Url::from_str("https://a.example/late").unwrap(), 1)
                .with_slot("a.example")
        )
        .is_err());

        let remaining = scheduler.pop().expect("b.example request should remain");
        assert_eq!(remaining.url.host_str(), Some("b.example"));
    }

    /// Scenario F from the design doc, at scale: with one domain pinned to
    /// the maximum score and another at the minimum, and a sharp softmax
    /// temperature, the high-priority domain should dominate selection.
    #[test]
    fn softmax_concentrates_pops_on_higher_priority_domain() {
        let mut scheduler = BalancedScheduler::new(0.0, 0.01, true);
        for i in 0..2000 {
            scheduler
                .push(
                    Request::new(
                        Url::from_str(&format!("https://hot.example/{i}")).unwrap(),
                        riptide_scheduler::priority::score_to_priority(1.0),
                    )
                    .with_slot("hot.example"),
                )
                .unwrap();
            scheduler
                .push(
                    Request::new(
                        Url::from_str(&format!("https://cold.example/{i}")).unwrap(),
                        riptide_scheduler::priority::score_to_priority(0.0),
                    )
                    .with_slot("cold.example"),
                )
                .unwrap();
        }

        let mut hot = 0;
        let mut total = 0;
        for _ in 0..1000 {
            if let Some(r) = scheduler.pop() {
                total += 1;
                if r.url.host_str() == Some("hot.example") {
                    hot += 1;
                }
            }
        }

        assert!(total > 0);
        assert!(
            hot as f64 / total as f64 >= 0.99,
            "expected >=99% of pops from the higher-priority domain, got {hot}/{total}"
        );
    }
}

mod form_finding_goal_over_a_session {
    use super::*;

    /// Across several pages of a domain, the best login-form score seen so
    /// far determines completion, not the most recent score.
    #[test]
    fn domain_closes_once_a_login_form_is_found() {
        let mut goal = FormFindingGoal::new(
            riptide_scheduler::FormFindingGoalConfig {
                target_form_type: "login".to_string(),
                found_threshold: 0.7,
                score_cache_capacity: 1000,
            },
            Box::new(|text: &str| {
                let mut scores = HashMap::new();
                let login_score = if text.contains("password") { 0.85 } else { 0.05 };
                scores.insert("login".to_string(), login_score);
                scores
            }),
        );

        let page1 = Response::new(
            Url::from_str("https://c.example/home").unwrap(),
            ResponseContent::Text("welcome to our site".to_string()),
        )
        .with_domain("c.example");
        goal.get_reward(&page1);
        assert!(!goal.is_achieved_for("c.example"));

        let page2 = Response::new(
            Url::from_str("https://c.example/login").unwrap(),
            ResponseContent::Text("enter your password to continue".to_string()),
        )
        .with_domain("c.example");
        goal.get_reward(&page2);
        assert!(goal.is_achieved_for("c.example"));
    }
}
