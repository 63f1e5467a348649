//! Canned demo content served by the fixture gateway.

use chrono::{DateTime, Duration, Utc};

use crate::models::{
    AdminStats, ContentType, Conversation, Document, Message, NewsItem, PracticeArea, Role,
    SourceCitation, User,
};

pub const DEMO_USER_ID: &str = "demo-user-1";
pub const DEMO_COMPANY: &str = "Demo Company";
pub const DEMO_EMAIL: &str = "john@futurum.com";
pub const ANALYSIS_CONVERSATION_ID: &str = "demo-conv-1";

fn ago(duration: Duration) -> DateTime<Utc> {
    Utc::now() - duration
}

fn area(id: i64, name: &str, slug: &str, description: &str) -> PracticeArea {
    PracticeArea {
        id,
        name: name.to_string(),
        slug: slug.to_string(),
        description: Some(description.to_string()),
    }
}

pub fn practice_areas() -> Vec<PracticeArea> {
    vec![
        area(1, "AI Platforms", "ai-platforms", "Artificial Intelligence and Machine Learning platforms"),
        area(2, "Cybersecurity & Resilience", "cybersecurity", "Security solutions and cyber resilience"),
        area(3, "Data Intelligence, Analytics, & Infrastructure", "data-intelligence", "Data platforms and analytics"),
        area(4, "Digital Leadership & CIO", "digital-leadership", "CIO strategy and digital leadership"),
        area(5, "Ecosystems, Channels, & Marketplaces", "ecosystems", "Partner ecosystems and cloud marketplaces"),
        area(6, "Enterprise Software & Digital Workflows", "enterprise-software", "Enterprise software solutions"),
        area(7, "Intelligent Devices", "intelligent-devices", "Smart devices and edge computing"),
        area(8, "Semiconductors, Supply Chain, & Emerging Tech", "semiconductors", "Chips and emerging technologies"),
        area(9, "Software Lifecycle Engineering", "software-lifecycle", "DevOps and software development"),
    ]
}

pub fn practice_area_name(id: i64) -> String {
    practice_areas()
        .into_iter()
        .find(|a| a.id == id)
        .map(|a| a.name)
        .unwrap_or_else(|| "Unknown".to_string())
}

pub fn areas_by_id(ids: &[i64]) -> Vec<PracticeArea> {
    let all = practice_areas();
    ids.iter()
        .filter_map(|id| all.iter().find(|a| a.id == *id).cloned())
        .collect()
}

/// The signed-in demo analyst. Email and company follow what was typed.
pub fn demo_user(email: &str, company_name: Option<&str>) -> User {
    User {
        id: DEMO_USER_ID.to_string(),
        email: email.to_string(),
        company_name: Some(company_name.unwrap_or("IBM").to_string()),
        is_admin: true,
        is_active: true,
        created_at: Utc::now(),
        practice_areas: areas_by_id(&[1, 2]),
    }
}

pub fn users() -> Vec<User> {
    let user = |id: &str, email: &str, company: &str, is_admin: bool, areas: Vec<PracticeArea>, days: i64| User {
        id: id.to_string(),
        email: email.to_string(),
        company_name: Some(company.to_string()),
        is_admin,
        is_active: true,
        created_at: ago(Duration::days(days)),
        practice_areas: areas,
    };
    vec![
        user("user-1", "nick.patience@ibm.com", "IBM", false, areas_by_id(&[1, 2]), 30),
        user("user-2", "sarah.chen@microsoft.com", "Microsoft", false, areas_by_id(&[1, 6]), 45),
        user("user-3", "admin@futurumgroup.com", "Futurum Group", true, practice_areas(), 90),
    ]
}

pub fn documents() -> Vec<Document> {
    let doc = |id: &str, title: &str, content_type: ContentType, description: &str, author: &str, area: i64, days: i64, chunks: i64| Document {
        id: id.to_string(),
        title: title.to_string(),
        description: Some(description.to_string()),
        content_type,
        practice_area_id: area,
        file_name: None,
        file_size_bytes: None,
        source_url: None,
        author: Some(author.to_string()),
        published_at: Some(ago(Duration::days(days))),
        created_at: ago(Duration::days(days)),
        chunk_count: chunks,
    };
    vec![
        doc(
            "doc-1",
            "Enterprise AI Platform Market Analysis 2026",
            ContentType::ResearchReport,
            "Analysis of the enterprise AI platform market, with vendor rankings and 6-12 month predictions.",
            "Daniel Newman",
            1,
            7,
            12,
        ),
        doc(
            "doc-2",
            "Agentic AI: From Hype to Implementation",
            ContentType::Whitepaper,
            "A practical guide to running autonomous AI agents in enterprise environments.",
            "Patrick Moorhead",
            1,
            14,
            8,
        ),
        doc(
            "doc-3",
            "Cybersecurity Landscape Q1 2026",
            ContentType::MarketData,
            "Quarterly view of the cybersecurity market: threat landscape and vendor performance.",
            "Ron Westfall",
            2,
            21,
            15,
        ),
        doc(
            "doc-4",
            "Cloud GTM Strategy Playbook",
            ContentType::Whitepaper,
            "Selling through the AWS, Azure and Google Cloud marketplaces.",
            "Shelly Kramer",
            5,
            28,
            10,
        ),
    ]
}

pub fn stats() -> AdminStats {
    AdminStats {
        users: 47,
        documents: 523,
        vectors: 12847,
    }
}

pub fn news() -> Vec<NewsItem> {
    let item = |id: &str, title: &str, summary: &str, days: i64| NewsItem {
        id: id.to_string(),
        title: title.to_string(),
        summary: summary.to_string(),
        source: "Futurum Research".to_string(),
        date: ago(Duration::days(days)),
        url: "#".to_string(),
    };
    vec![
        item(
            "news-1",
            "IBM Announces Major watsonx AI Platform Updates",
            "New foundation models and stronger governance tooling for the watsonx platform.",
            1,
        ),
        item(
            "news-2",
            "IBM Cloud Expands Hybrid AI Infrastructure",
            "AI workloads can now move between on-premises and cloud environments.",
            2,
        ),
        item(
            "news-3",
            "IBM Partners with SAP on Generative AI Integration",
            "watsonx capabilities land directly inside SAP enterprise workflows.",
            3,
        ),
        item(
            "news-4",
            "IBM Consulting Launches AI Center of Excellence",
            "Dedicated teams and implementation playbooks to speed up enterprise AI adoption.",
            5,
        ),
        item(
            "news-5",
            "IBM Research Advances Quantum-AI Integration",
            "Research results point to quantum computing speeding up model training.",
            7,
        ),
    ]
}

fn message(id: &str, role: Role, content: &str, citations: &[&str], at: DateTime<Utc>) -> Message {
    Message {
        id: id.to_string(),
        role,
        content: content.to_string(),
        citations: citations.iter().map(|c| c.to_string()).collect(),
        created_at: at,
    }
}

fn analysis_transcript() -> Vec<Message> {
    let base = Duration::days(1);
    let step = |n: i64| ago(base - Duration::seconds(100 * n));
    vec![
        message(
            "msg-1",
            Role::User,
            "What is the current state of the AI Platforms market and what does the forecast look like through 2030?",
            &[],
            step(0),
        ),
        message(
            "msg-2",
            Role::Assistant,
            "## Market Size Overview\n\n\
             The AI Platforms market grows from **$24.9B in 2024 to $292B by 2030**, \
             roughly **50.8% CAGR**.\n\n\
             - **Bull case**: $819B by 2030\n\
             - **Base case**: $292B by 2030\n\
             - **Bear case**: $155B by 2030\n",
            &["doc-1", "doc-2"],
            step(1),
        ),
        message(
            "msg-3",
            Role::User,
            "Can you break down the market by segment? Which areas are growing fastest?",
            &[],
            step(2),
        ),
        message(
            "msg-4",
            Role::Assistant,
            "## Market Segmentation\n\n\
             | Segment | 2024 Share | 2030 Share |\n\
             |---|---|---|\n\
             | Application AgentBuilders | 13% | 28.6% |\n\
             | Infrastructure Inference | 20% | 16.7% |\n\
             | Infrastructure Training | 18% | 16.5% |\n\
             | ModelOps Monitoring | 8% | 11.2% |\n\n\
             Agent builders grow fastest as enterprises shift toward agentic AI.",
            &["doc-1", "doc-3"],
            step(3),
        ),
        message(
            "msg-5",
            Role::User,
            "What about industry verticals? Which industries are adopting AI platforms fastest?",
            &[],
            step(4),
        ),
        message(
            "msg-6",
            Role::Assistant,
            "## Industry Verticals\n\n\
             1. **Technology**: ~110% YoY in 2025\n\
             2. **Financial Services**: ~83% YoY\n\
             3. **Retail & E-commerce**: ~80% YoY\n\
             4. **Healthcare & Life Sciences**: ~78% YoY\n\
             5. **Manufacturing**: ~77% YoY\n\n\
             *Source: Futurum AI Platforms Market Forecast, November 2025*",
            &["doc-1", "doc-2", "doc-3"],
            step(5),
        ),
    ]
}

pub fn conversations() -> Vec<Conversation> {
    let conv = |id: &str, title: &str, days: i64, messages: Vec<Message>| Conversation {
        id: id.to_string(),
        title: Some(title.to_string()),
        created_at: ago(Duration::days(days)),
        updated_at: ago(Duration::days(days)),
        messages,
    };
    vec![
        conv(ANALYSIS_CONVERSATION_ID, "AI Platform Market Analysis", 1, analysis_transcript()),
        conv("demo-conv-2", "Cloud GTM Strategy for AWS", 2, Vec::new()),
        conv("demo-conv-3", "Cybersecurity Vendor Evaluation", 3, Vec::new()),
    ]
}

/// A prepared assistant reply.
pub struct CannedAnswer {
    pub response: &'static str,
    pub sources: Vec<SourceCitation>,
}

/// Market-sizing questions get the TAM briefing; everything else gets the
/// general overview.
pub fn is_market_sizing_question(message: &str) -> bool {
    let lower = message.to_lowercase();
    let mentions_tam = lower
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| word == "tam");
    lower.contains("total addressable market")
        || mentions_tam
        || (lower.contains("market") && lower.contains("2030"))
}

pub fn answer_for(message: &str) -> CannedAnswer {
    if is_market_sizing_question(message) {
        market_sizing_answer()
    } else {
        overview_answer()
    }
}

fn market_sizing_answer() -> CannedAnswer {
    CannedAnswer {
        response: "# Total Addressable Market Through 2030\n\n\
            ## AI Platforms\n\
            Base case **$292.0B by 2030** (bear $155.1B, bull $819.4B), up from $24.9B in 2024. \
            Growth runs at 78% YoY in 2025 and settles near 33.5% by 2030. \
            Application agent builders become the largest segment at 28.6% share.\n\n\
            ## Cybersecurity\n\
            Cloud security leads in absolute size ($70.7B by 2029); identity & access \
            management grows fastest at 14.6% CAGR.\n\n\
            ## Data Management & Analytics\n\
            Reaches **$1.22T by 2031** in the base case. The semantic layer accelerates to \
            30% YoY growth by 2031.\n\n\
            ## Enterprise Applications\n\
            Reaches **$762B by 2031**, led by communication services (15-18% YoY).\n\n\
            **Bottom line:** AI Platforms has the highest growth rates; Data Management & \
            Analytics has the largest absolute TAM.",
        sources: vec![
            SourceCitation::new(
                Some("doc-tam-1"),
                "AI Platforms Market Intelligence",
                "AI Platforms",
                "market_data",
                "Market sizing and forecasts for the AI Platforms market through 2030, with segment analysis and growth drivers...",
                0.98,
            ),
            SourceCitation::new(
                Some("doc-tam-2"),
                "Cybersecurity Market Intelligence",
                "Cybersecurity",
                "market_data",
                "TAM analysis across Cloud Security, Network Security, IAM, and Application Security...",
                0.96,
            ),
            SourceCitation::new(
                Some("doc-tam-3"),
                "Data Management & Analytics Intelligence",
                "Data Management",
                "market_data",
                "Market sizing through 2031 covering Semantic Layer, AI Development & Operations, and Database Systems...",
                0.95,
            ),
            SourceCitation::new(
                Some("doc-tam-4"),
                "Enterprise Apps Market Intelligence",
                "Enterprise Apps",
                "market_data",
                "Enterprise Applications analysis including Communication Services, ERP, and CRM growth trajectories...",
                0.94,
            ),
        ],
    }
}

fn overview_answer() -> CannedAnswer {
    CannedAnswer {
        response: "## Market Overview\n\n\
            1. **Agentic AI adoption**: organizations are moving from chatbots to agents \
            that execute whole workflows.\n\
            2. **Data infrastructure investment**: data quality and governance come first.\n\
            3. **Hybrid deployment**: most enterprises mix cloud and on-premises AI.\n\n\
            ## Recommendations\n\n\
            - **0-6 months**: data readiness and governance\n\
            - **6-12 months**: pilot agents for customer service\n\
            - **12+ months**: scale the pilots that worked\n\n\
            *Source: Futurum Intelligence Platform, Q1 2026*",
        sources: vec![
            SourceCitation::new(
                Some("doc-1"),
                "Enterprise AI Platform Market Analysis 2026",
                "AI Platforms",
                "research_report",
                "The enterprise AI platform market continues to evolve rapidly, with spending projected to reach $180B by 2027...",
                0.94,
            ),
            SourceCitation::new(
                Some("doc-2"),
                "Agentic AI: From Hype to Implementation",
                "AI Platforms",
                "whitepaper",
                "Production agentic AI deployments face challenges around orchestration, governance, and ROI measurement...",
                0.89,
            ),
            SourceCitation::new(
                Some("doc-3"),
                "Futurum Signal: AI Platform Vendor Rankings",
                "AI Platforms",
                "market_data",
                "Continuous vendor evaluation shows significant movement in the enterprise AI platform space...",
                0.85,
            ),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_market_sizing_detection() {
        assert!(is_market_sizing_question("What is the TAM?"));
        assert!(is_market_sizing_question("Give me the total addressable market"));
        assert!(is_market_sizing_question("How big is the market by 2030?"));
        assert!(!is_market_sizing_question("Stamp duty in the UK"));
        assert!(!is_market_sizing_question("Who leads in cloud security?"));
    }

    #[test]
    fn test_only_analysis_conversation_has_transcript() {
        let convs = conversations();
        assert_eq!(convs.len(), 3);
        assert_eq!(convs[0].id, ANALYSIS_CONVERSATION_ID);
        assert_eq!(convs[0].messages.len(), 6);
        assert!(convs[1..].iter().all(|c| c.messages.is_empty()));
    }
}
