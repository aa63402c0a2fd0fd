/// A job role the coach can practice, with its system prompt and candidate scenarios.
#[derive(Debug, PartialEq, Eq)]
pub struct Role {
    pub key: &'static str,
    pub system_prompt: &'static str,
    pub scenarios: [&'static str; 3],
}

impl Role {
    /// The key as it reads in prose, e.g. `data-analyst` -> `data analyst`.
    pub fn title(&self) -> String {
        self.key.replace('-', " ")
    }
}

pub fn lookup(key: &str) -> Option<&'static Role> {
    ROLES.iter().find(|role| role.key == key)
}

pub static ROLES: [Role; 10] = [
    Role {
        key: "developer",
        system_prompt: "You are an AI coach helping a software developer practice professional communication. Provide realistic workplace scenarios and evaluate their responses for clarity, technical accuracy, and professionalism.",
        scenarios: [
            "Your team lead asks you to explain why a feature is taking longer than estimated. How do you respond?",
            "A non-technical stakeholder asks you to explain a complex bug. How do you communicate this?",
            "You need to push back on a tight deadline. How do you approach this conversation?",
        ],
    },
    Role {
        key: "data-analyst",
        system_prompt: "You are an AI coach helping a data analyst practice professional communication. Provide realistic scenarios involving data interpretation and stakeholder communication.",
        scenarios: [
            "Present your analysis findings that contradict the executive team's assumptions.",
            "Explain data quality issues affecting a critical business report.",
            "A stakeholder wants you to manipulate data to support their narrative. How do you respond?",
        ],
    },
    Role {
        key: "product-manager",
        system_prompt: "You are an AI coach helping a product manager practice professional communication. Provide scenarios involving cross-functional collaboration and strategic decision-making.",
        scenarios: [
            "Two teams disagree on feature priorities. How do you facilitate this discussion?",
            "Marketing wants a feature that engineering says is technically complex. How do you mediate?",
            "Present a product pivot decision to resistant stakeholders.",
        ],
    },
    Role {
        key: "ux-designer",
        system_prompt: "You are an AI coach helping a UX designer practice professional communication. Provide scenarios involving design critique and user research presentation.",
        scenarios: [
            "Present user research findings that challenge the CEO's product vision.",
            "A developer says your design is too complex to implement. How do you respond?",
            "Defend your design decisions during a critique session.",
        ],
    },
    Role {
        key: "software-engineer",
        system_prompt: "You are an AI coach helping a software engineer practice professional communication. Provide scenarios involving technical discussions and code reviews.",
        scenarios: [
            "Explain technical debt to non-technical managers requesting new features.",
            "Your code review feedback was misunderstood as criticism. How do you clarify?",
            "Propose a major architectural change to the team.",
        ],
    },
    Role {
        key: "data-scientist",
        system_prompt: "You are an AI coach helping a data scientist practice professional communication. Provide scenarios involving model explanations and data-driven recommendations.",
        scenarios: [
            "Explain why your ML model's accuracy dropped in production.",
            "Business wants faster results but you need more time for validation. How do you respond?",
            "Present the limitations of your predictive model to eager stakeholders.",
        ],
    },
    Role {
        key: "marketing-manager",
        system_prompt: "You are an AI coach helping a marketing manager practice professional communication. Provide scenarios involving campaign planning and stakeholder presentations.",
        scenarios: [
            "Your campaign underperformed. Present results and next steps to leadership.",
            "Sales team wants more leads but you need more budget. How do you negotiate?",
            "Explain why a viral marketing idea won't work for the brand.",
        ],
    },
    Role {
        key: "sales-representative",
        system_prompt: "You are an AI coach helping a sales representative practice professional communication. Provide scenarios involving client interactions and objection handling.",
        scenarios: [
            "A client is upset about delayed delivery. How do you handle this conversation?",
            "Present pricing to a cost-conscious prospect.",
            "A competitor is offering a lower price. How do you respond?",
        ],
    },
    Role {
        key: "hr-specialist",
        system_prompt: "You are an AI coach helping an HR specialist practice professional communication. Provide scenarios involving employee relations and policy communication.",
        scenarios: [
            "An employee complains about unfair treatment. How do you investigate sensitively?",
            "Communicate a unpopular policy change to the company.",
            "Mediate a conflict between two team members.",
        ],
    },
    Role {
        key: "project-manager",
        system_prompt: "You are an AI coach helping a project manager practice professional communication. Provide scenarios involving team coordination and status updates.",
        scenarios: [
            "The project is behind schedule. Update stakeholders on the situation.",
            "A team member is underperforming. How do you address this?",
            "Scope creep is threatening the deadline. How do you communicate boundaries?",
        ],
    },
];

/// Follow-up questions used when the model reply can't be used, in the order
/// a conversation walks through them.
pub static FOLLOW_UPS: [&str; 9] = [
    "That's a good start. How would you handle pushback from stakeholders on this approach?",
    "Interesting perspective. Can you elaborate on the specific steps you would take?",
    "I appreciate your thoughtful response. What would you do if the situation escalated?",
    "Good communication! How would you adjust your message for a different audience?",
    "Well articulated. What metrics or evidence would you use to support your position?",
    "Thank you for that detailed response. How would you follow up after this conversation?",
    "Strong answer. What potential objections might you face and how would you address them?",
    "Nice work! How would you document this discussion for future reference?",
    "Good thinking. What timeline would you propose for implementing this solution?",
];
